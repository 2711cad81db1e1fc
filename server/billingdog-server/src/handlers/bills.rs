//! Bill CRUD, per-bill claims and PDF invoices.

use crate::error::ApiError;
use crate::server::BillingDogServer;
use crate::validation::RequestValidation;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use billing_service::{render_invoice, Bill, BillDetails, BillId, InsuranceClaim, NewBill};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct BillListResponse {
    pub success: bool,
    pub bills: Vec<Bill>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BillCreatedResponse {
    pub success: bool,
    pub bill: BillDetails,
}

/// Bill as shown on the claim form
#[derive(Debug, Serialize, ToSchema)]
pub struct BillView {
    pub id: BillId,
    pub patient_name: String,
    pub patient_dob: NaiveDate,
    pub insurance_provider: Option<String>,
    pub policy_number: Option<String>,
    pub diagnoses: Vec<DiagnosisView>,
    pub procedures: Vec<ProcedureView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiagnosisView {
    #[schema(example = "J06.9")]
    pub icd10_code: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcedureView {
    #[schema(example = "99213")]
    pub cpt_code: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 150.0)]
    pub amount: Decimal,
}

impl From<BillDetails> for BillView {
    fn from(details: BillDetails) -> Self {
        Self {
            id: details.bill.id,
            patient_name: details.bill.patient_name,
            patient_dob: details.bill.patient_dob,
            insurance_provider: details.bill.insurance_provider,
            policy_number: details.bill.policy_number,
            diagnoses: details
                .diagnoses
                .into_iter()
                .map(|d| DiagnosisView {
                    icd10_code: d.icd10_code,
                    description: d.description,
                })
                .collect(),
            procedures: details
                .procedures
                .into_iter()
                .map(|p| ProcedureView {
                    cpt_code: p.cpt_code,
                    description: p.description,
                    amount: p.amount,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BillViewResponse {
    pub success: bool,
    pub bill: BillView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BillDeletedResponse {
    pub success: bool,
    #[schema(example = "Bill deleted")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimListResponse {
    pub success: bool,
    pub claims: Vec<InsuranceClaim>,
}

fn bill_id(path: Result<Path<BillId>, PathRejection>) -> Result<BillId, ApiError> {
    let Path(id) = path.map_err(|e| ApiError::validation(e.body_text()))?;
    Ok(id)
}

async fn load_bill(server: &BillingDogServer, id: BillId) -> Result<BillDetails, ApiError> {
    server
        .store
        .get_bill(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill"))
}

/// Dashboard listing
#[utoipa::path(
    get,
    path = "/api/bills",
    tag = "bills",
    responses(
        (status = 200, description = "All bills, newest first", body = BillListResponse)
    )
)]
pub async fn list_bills(
    State(server): State<BillingDogServer>,
) -> Result<Json<BillListResponse>, ApiError> {
    let bills = server.store.list_bills().await?;
    Ok(Json(BillListResponse {
        success: true,
        bills,
    }))
}

#[utoipa::path(
    post,
    path = "/api/bills",
    tag = "bills",
    request_body = NewBill,
    responses(
        (status = 201, description = "Bill created", body = BillCreatedResponse),
        (status = 400, description = "Invalid bill", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_bill(
    State(server): State<BillingDogServer>,
    payload: Result<Json<NewBill>, JsonRejection>,
) -> Result<(StatusCode, Json<BillCreatedResponse>), ApiError> {
    let Json(new_bill) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    new_bill.validate()?;

    let bill = server.store.create_bill(new_bill).await?;
    info!(bill_id = bill.bill.id, "Bill created");

    Ok((
        StatusCode::CREATED,
        Json(BillCreatedResponse {
            success: true,
            bill,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/bills/{id}",
    tag = "bills",
    params(("id" = i64, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill with its line items", body = BillViewResponse),
        (status = 404, description = "Unknown bill", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_bill(
    State(server): State<BillingDogServer>,
    path: Result<Path<BillId>, PathRejection>,
) -> Result<Json<BillViewResponse>, ApiError> {
    let id = bill_id(path)?;
    let details = load_bill(&server, id).await?;
    Ok(Json(BillViewResponse {
        success: true,
        bill: details.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/bills/{id}",
    tag = "bills",
    params(("id" = i64, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill and its line items deleted", body = BillDeletedResponse),
        (status = 404, description = "Unknown bill", body = crate::error::ErrorResponse),
        (status = 409, description = "Claims still reference the bill", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_bill(
    State(server): State<BillingDogServer>,
    path: Result<Path<BillId>, PathRejection>,
) -> Result<Json<BillDeletedResponse>, ApiError> {
    let id = bill_id(path)?;
    server.store.delete_bill(id).await?;
    info!(bill_id = id, "Bill deleted");

    Ok(Json(BillDeletedResponse {
        success: true,
        message: "Bill deleted".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/bills/{id}/claims",
    tag = "claims",
    params(("id" = i64, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Claims filed against the bill, newest first", body = ClaimListResponse),
        (status = 404, description = "Unknown bill", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_bill_claims(
    State(server): State<BillingDogServer>,
    path: Result<Path<BillId>, PathRejection>,
) -> Result<Json<ClaimListResponse>, ApiError> {
    let id = bill_id(path)?;
    load_bill(&server, id).await?;
    let claims = server.store.claims_for_bill(id).await?;

    Ok(Json(ClaimListResponse {
        success: true,
        claims,
    }))
}

#[utoipa::path(
    get,
    path = "/api/bills/{id}/invoice",
    tag = "bills",
    params(("id" = i64, Path, description = "Bill id")),
    responses(
        (status = 200, description = "PDF invoice", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Unknown bill", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_invoice(
    State(server): State<BillingDogServer>,
    path: Result<Path<BillId>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = bill_id(path)?;
    let details = load_bill(&server, id).await?;

    // printpdf is synchronous and allocation heavy
    let pdf = tokio::task::spawn_blocking(move || render_invoice(&details, Utc::now()))
        .await
        .map_err(|e| ApiError::Internal {
            message: "Failed to render invoice".to_string(),
            detail: Some(e.to_string()),
        })??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"invoice-{}.pdf\"", id),
            ),
        ],
        pdf,
    )
        .into_response())
}

use crate::error::ApiError;
use crate::server::BillingDogServer;
use crate::validation::SubmitClaimRequest;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitClaimResponse {
    pub success: bool,
    #[schema(example = "Claim submitted successfully")]
    pub message: String,
    #[schema(example = "CLM-20240304-42")]
    pub claim_number: String,
}

/// Submit an insurance claim for a bill
///
/// Persists the claim, encodes it as an 837-style interchange and hands it
/// to the clearinghouse. A clearinghouse rejection is recorded on the claim
/// and the bill before the 500 is returned.
#[utoipa::path(
    post,
    path = "/api/submit_claim",
    tag = "claims",
    request_body = SubmitClaimRequest,
    responses(
        (status = 200, description = "Claim accepted", body = SubmitClaimResponse),
        (status = 400, description = "Invalid request or bill without insurance", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown bill", body = crate::error::ErrorResponse),
        (status = 500, description = "Clearinghouse rejection or internal failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_claim(
    State(server): State<BillingDogServer>,
    payload: Result<Json<SubmitClaimRequest>, JsonRejection>,
) -> Result<Json<SubmitClaimResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    // an unknown bill is a 404 even when the rest of the form is incomplete
    let bill_id = request.bill_id()?;
    if server.store.get_bill(bill_id).await?.is_none() {
        return Err(ApiError::not_found("Bill"));
    }
    let submission = request.into_submission()?;

    let receipt = server.claims.submit(submission).await?;
    info!(
        bill_id,
        claim_id = receipt.claim_id,
        claim_number = %receipt.claim_number,
        "Claim submitted"
    );

    Ok(Json(SubmitClaimResponse {
        success: true,
        message: receipt.message,
        claim_number: receipt.claim_number,
    }))
}

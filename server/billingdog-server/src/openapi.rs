use axum::Json;
use utoipa::OpenApi;

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::handlers::health::health_check,

        // Rate endpoints
        crate::handlers::rates::get_exchange_rates,
        crate::handlers::rates::get_crypto_prices,

        // Bill endpoints
        crate::handlers::bills::list_bills,
        crate::handlers::bills::create_bill,
        crate::handlers::bills::get_bill,
        crate::handlers::bills::delete_bill,
        crate::handlers::bills::list_bill_claims,
        crate::handlers::bills::download_invoice,

        // Claim endpoints
        crate::handlers::claims::submit_claim,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::handlers::health::HealthResponse,
            crate::handlers::rates::ExchangeRatesResponse,
            crate::handlers::rates::CryptoPricesResponse,
            crate::handlers::bills::BillListResponse,
            crate::handlers::bills::BillCreatedResponse,
            crate::handlers::bills::BillViewResponse,
            crate::handlers::bills::BillView,
            crate::handlers::bills::DiagnosisView,
            crate::handlers::bills::ProcedureView,
            crate::handlers::bills::BillDeletedResponse,
            crate::handlers::bills::ClaimListResponse,
            crate::handlers::claims::SubmitClaimResponse,
            crate::validation::SubmitClaimRequest,
            billing_service::Bill,
            billing_service::BillDetails,
            billing_service::Diagnosis,
            billing_service::Procedure,
            billing_service::InsuranceClaim,
            billing_service::ClaimStatus,
            billing_service::NewBill,
            billing_service::NewDiagnosis,
            billing_service::NewProcedure,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "rates", description = "Exchange rates and crypto prices with cached fallback"),
        (name = "bills", description = "Bills, line items and invoices"),
        (name = "claims", description = "Insurance claim submission"),
    ),
    info(
        title = "BillingDog API",
        version = "0.1.0",
        description = "Healthcare billing: bills, insurance claims, invoices and payment reference rates.",
        license(name = "AGPL-3.0-only"),
    ),
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/get_exchange_rates",
            "/get_crypto_prices",
            "/api/bills",
            "/api/bills/{id}",
            "/api/bills/{id}/claims",
            "/api/bills/{id}/invoice",
            "/api/submit_claim",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}

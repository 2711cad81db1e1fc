use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::BillingDogServer;
use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system health status
    #[schema(example = "healthy")]
    pub status: String,
    /// Current timestamp in RFC3339 format
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: String,
    /// API version
    #[schema(example = "0.1.0")]
    pub version: String,
    /// System uptime in seconds
    #[schema(example = 3600)]
    pub uptime: u64,
    /// Individual service health checks
    pub checks: HashMap<String, String>,
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health report; `status` is `degraded` when the store is down", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(server): State<BillingDogServer>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let mut checks = HashMap::new();

    let store_healthy = server.store.is_healthy().await;
    checks.insert(
        "store".to_string(),
        if store_healthy { "healthy" } else { "unhealthy" }.to_string(),
    );
    checks.insert("store_backend".to_string(), server.store.backend().to_string());

    let response = HealthResponse {
        status: if store_healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime(),
        checks,
    };

    Ok(Json(api_success(response)))
}

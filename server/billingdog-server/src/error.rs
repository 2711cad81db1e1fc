use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use billing_service::BillingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable error message
    #[schema(example = "Bill not found")]
    pub error: String,
    /// Seconds until the client may retry (429 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{resource_type} not found")]
    NotFound { resource_type: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Rate limit exceeded. Try again in {retry_after} seconds")]
    RateLimit { retry_after: u64 },

    /// An upstream service refused the request; its message is passed on
    #[error("{message}")]
    Upstream { message: String },

    /// `detail` is logged, never returned
    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            detail: None,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::RateLimit { .. } => "rate_limit_exceeded",
            ApiError::Upstream { .. } => "upstream_error",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Validation(message) => ApiError::Validation { message },
            BillingError::NotFound(resource_type) => ApiError::NotFound { resource_type },
            BillingError::Conflict(message) => ApiError::Conflict { message },
            err @ BillingError::MalformedName(_) => ApiError::Validation {
                message: err.to_string(),
            },
            BillingError::Clearinghouse(message) => ApiError::Upstream { message },
            err @ BillingError::Invoice(_) => ApiError::Internal {
                message: "Failed to render invoice".to_string(),
                detail: Some(err.to_string()),
            },
            err @ BillingError::Database(_) => ApiError::Internal {
                message: "Internal server error".to_string(),
                detail: Some(err.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        // Log the error with correlation ID
        if status_code.is_server_error() {
            let detail = match &self {
                ApiError::Internal { detail, .. } => detail.as_deref().unwrap_or(""),
                _ => "",
            };
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                detail,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let retry_after = match &self {
            ApiError::RateLimit { retry_after } => Some(*retry_after),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            retry_after,
        };

        let mut response = (status_code, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_errors_map_to_status_codes() {
        let cases = [
            (BillingError::Validation("Missing bill ID".into()), StatusCode::BAD_REQUEST),
            (BillingError::NotFound("Bill".into()), StatusCode::NOT_FOUND),
            (BillingError::Conflict("has claims".into()), StatusCode::CONFLICT),
            (BillingError::MalformedName("one token".into()), StatusCode::BAD_REQUEST),
            (BillingError::Clearinghouse("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn not_found_message_names_the_resource() {
        let err = ApiError::from(BillingError::NotFound("Bill".into()));
        assert_eq!(err.to_string(), "Bill not found");
    }

    #[test]
    fn rate_limit_response_carries_retry_after_header() {
        let response = ApiError::RateLimit { retry_after: 17 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "17");
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::Internal {
            message: "Internal server error".into(),
            detail: Some("relation \"bill\" does not exist".into()),
        };
        assert_eq!(err.to_string(), "Internal server error");
    }
}

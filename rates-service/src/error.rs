use thiserror::Error;

/// Why a single fetch from a quote source failed
#[derive(Error, Debug)]
pub enum RatesError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RatesError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RatesError::Timeout
        } else if let Some(status) = err.status() {
            RatesError::Status(status.as_u16())
        } else if err.is_decode() {
            RatesError::Malformed(err.to_string())
        } else {
            RatesError::Network(err.to_string())
        }
    }
}

pub type RatesResult<T> = Result<T, RatesError>;

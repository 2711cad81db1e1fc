use database_layer::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed subscriber name: {0}")]
    MalformedName(String),

    #[error("Clearinghouse rejected claim: {0}")]
    Clearinghouse(String),

    #[error("Invoice rendering error: {0}")]
    Invoice(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Database(DatabaseError::from_query(err))
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

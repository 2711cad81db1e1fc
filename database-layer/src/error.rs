use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Classify a driver error, pulling constraint violations out of the generic bucket.
    pub fn from_query(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::ForeignKeyViolation(db_err.message().to_string());
            }
        }
        DatabaseError::SqlxError(err)
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

// Transaction management
use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{Postgres, Transaction};
use tracing::debug;

/// Owned PostgreSQL transaction. Dropping it without `commit` rolls back.
pub type PgTransaction = Transaction<'static, Postgres>;

/// Hands out transactions from the shared pool
#[derive(Clone)]
pub struct TransactionManager {
    pool: DatabasePool,
}

impl TransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Begin a new transaction
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::QueryFailed`] if no connection can be acquired.
    pub async fn begin(&self) -> DatabaseResult<PgTransaction> {
        debug!("Beginning transaction");

        self.pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to begin transaction: {}", e)))
    }
}

//! Database layer for BillingDog Engine
//!
//! Thin wrapper over `sqlx` for PostgreSQL:
//!
//! - [`DatabasePool`]: pooled connections, health checks, embedded migrations
//! - [`TransactionManager`]: owned transactions that roll back on drop
//! - [`DatabaseError`]: driver errors with constraint violations classified
//!
//! The schema lives in `migrations/` and covers bills, their diagnoses and
//! procedures (cascade-deleted with the bill) and insurance claims.
//!
//! ```rust,no_run
//! use database_layer::{DatabaseConfig, DatabasePool, TransactionManager};
//!
//! # async fn run() -> Result<(), database_layer::DatabaseError> {
//! let config = DatabaseConfig {
//!     url: Some("postgresql://localhost/billingdog".to_string()),
//!     ..Default::default()
//! };
//! let pool = DatabasePool::connect(&config).await?;
//! let tx = TransactionManager::new(pool).begin().await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod transaction;

pub use connection::*;
pub use error::*;
pub use transaction::*;

// Database connection management
use crate::error::{DatabaseError, DatabaseResult};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info, warn};

/// Connection settings for the billing database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string; `None` means no relational store is configured
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Apply pending migrations on start-up
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 2,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 300,
            run_migrations: true,
        }
    }
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new database pool from configuration
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConnectionFailed`] when no URL is configured or
    /// the server cannot be reached, and [`DatabaseError::MigrationError`] when
    /// a pending migration fails to apply.
    pub async fn connect(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DatabaseError::ConnectionFailed("no database url configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .test_before_acquire(true)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database connection pool created");

        let db = Self { pool };
        if config.run_migrations {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// Wrap an existing pool (tests, tooling)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::MigrationError`] if any migration fails.
    pub async fn migrate(&self) -> DatabaseResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Get the underlying PgPool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the pool is healthy
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                false
            }
        }
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_without_url_fails_fast() {
        let result = DatabasePool::connect(&DatabaseConfig::default()).await;
        assert!(matches!(result, Err(DatabaseError::ConnectionFailed(_))));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"url": "postgresql://localhost/billingdog"}"#).unwrap();
        assert_eq!(config.url.as_deref(), Some("postgresql://localhost/billingdog"));
        assert_eq!(config.max_connections, 20);
        assert!(config.run_migrations);
    }
}

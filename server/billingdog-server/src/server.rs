use crate::config::AppConfig;
use crate::middleware::RateLimiter;
use anyhow::{Context, Result};
use billing_service::{
    BillingStore, ClaimSubmissionService, Clearinghouse, MemoryStore, PgBillingStore,
    SimulatedClearinghouse,
};
use database_layer::DatabasePool;
use rates_service::RateCache;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Main BillingDog server state
///
/// Everything process-wide (store, rate cache, limiters) is created here and
/// shared with handlers and middleware through axum state.
#[derive(Clone)]
pub struct BillingDogServer {
    /// Server configuration
    pub config: Arc<AppConfig>,
    /// Bill and claim persistence
    pub store: Arc<dyn BillingStore>,
    /// Claim submission workflow
    pub claims: Arc<ClaimSubmissionService>,
    /// Exchange-rate and crypto-price cache
    pub rates: Arc<RateCache>,
    /// Limiter guarding `/get_exchange_rates`
    pub exchange_limiter: Arc<RateLimiter>,
    /// Limiter guarding `/get_crypto_prices`
    pub crypto_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl BillingDogServer {
    /// Create a new BillingDog server instance
    ///
    /// Connects to PostgreSQL when `database.url` is set, otherwise keeps
    /// bills in memory.
    ///
    /// # Errors
    ///
    /// Fails when the database is unreachable, migrations fail or the HTTP
    /// client for the rate APIs cannot be built.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn BillingStore> = match &config.database.url {
            Some(_) => {
                // applies pending migrations when `run_migrations` is set
                let pool = DatabasePool::connect(&config.database)
                    .await
                    .context("Failed to connect to database")?;
                info!("Using PostgreSQL bill store");
                Arc::new(PgBillingStore::new(pool))
            }
            None => {
                warn!("No database URL configured, bills are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let clearinghouse = Arc::new(SimulatedClearinghouse::new(config.clearinghouse.latency()));
        let rates = RateCache::from_config(&config.rates).context("Failed to build rate cache")?;

        Ok(Self::from_parts(config, store, clearinghouse, Arc::new(rates)))
    }

    /// Assemble a server from already constructed collaborators
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn BillingStore>,
        clearinghouse: Arc<dyn Clearinghouse>,
        rates: Arc<RateCache>,
    ) -> Self {
        let claims = Arc::new(ClaimSubmissionService::new(store.clone(), clearinghouse));
        let exchange_limiter = Arc::new(RateLimiter::new(
            "exchange_rates",
            config.rate_limit.clone(),
        ));
        let crypto_limiter = Arc::new(RateLimiter::new(
            "crypto_prices",
            config.rate_limit.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            claims,
            rates,
            exchange_limiter,
            crypto_limiter,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server state was created
    pub fn uptime(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

//! Layered application configuration.
//!
//! Defaults, then an optional YAML/TOML file, then `BILLINGDOG__*`
//! environment variables (`BILLINGDOG__DATABASE__URL`,
//! `BILLINGDOG__RATE_LIMIT__MAX_REQUESTS`, ...).

use config::{Config, ConfigError, Environment, File};
use database_layer::DatabaseConfig;
use rates_service::RatesConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use crate::middleware::rate_limit::RateLimitConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rates: RatesConfig,
    pub rate_limit: RateLimitConfig,
    pub clearinghouse: ClearinghouseConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "BillingDog".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec![
                "http://localhost:5000".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearinghouseConfig {
    /// Simulated round trip to the clearinghouse
    pub latency_ms: u64,
}

impl Default for ClearinghouseConfig {
    fn default() -> Self {
        Self { latency_ms: 1000 }
    }
}

impl ClearinghouseConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl AppConfig {
    /// Load configuration, reading `path` if it exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file or an environment override does
    /// not deserialize into the expected shape.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("BILLINGDOG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::load(None).unwrap();

        assert_eq!(config.server.port, 5000);
        assert!(config.database.url.is_none());
        assert_eq!(config.rates.cache_ttl_secs, 30);
        assert_eq!(config.rates.max_attempts, 3);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert!(config.rate_limit.trust_forwarded_headers);
        assert_eq!(config.clearinghouse.latency(), Duration::from_secs(1));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = AppConfig::load(Some("does-not-exist.yaml")).unwrap();
        assert_eq!(config.server.name, "BillingDog");
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate cache and upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Exchange-rate API base; `/USD` is appended
    pub exchange_api_url: String,
    pub crypto_api_url: String,
    pub crypto_api_key: Option<String>,
    /// How long a snapshot is served before refreshing
    pub cache_ttl_secs: u64,
    /// Attempts per refresh, including the first
    pub max_attempts: u32,
    /// Sleep before the second attempt; doubles after each failure
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            exchange_api_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            crypto_api_url: "https://min-api.cryptocompare.com/data/price".to_string(),
            crypto_api_key: None,
            cache_ttl_secs: 30,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            request_timeout_secs: 5,
        }
    }
}

impl RatesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

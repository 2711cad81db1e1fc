use crate::config::RatesConfig;
use crate::error::{RatesError, RatesResult};
use crate::tables::tracked_currencies;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Upstream price feed. Each call is a single attempt; retries live in the cache.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Units of each tracked currency per 1 USD
    async fn exchange_rates(&self) -> RatesResult<BTreeMap<String, f64>>;

    /// USD price of one coin
    async fn crypto_price(&self, symbol: &str) -> RatesResult<f64>;
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(rename = "USD")]
    usd: Option<f64>,
}

/// Quote source backed by the public exchange-rate and crypto-price HTTP APIs
pub struct HttpQuoteSource {
    client: reqwest::Client,
    exchange_api_url: String,
    crypto_api_url: String,
    crypto_api_key: String,
}

impl HttpQuoteSource {
    /// # Errors
    ///
    /// Returns [`RatesError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &RatesConfig) -> RatesResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RatesError::Config(e.to_string()))?;

        Ok(Self {
            client,
            exchange_api_url: config.exchange_api_url.trim_end_matches('/').to_string(),
            crypto_api_url: config.crypto_api_url.clone(),
            crypto_api_key: config.crypto_api_key.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn exchange_rates(&self) -> RatesResult<BTreeMap<String, f64>> {
        let url = format!("{}/USD", self.exchange_api_url);
        let body: ExchangeResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut rates = BTreeMap::new();
        for code in tracked_currencies() {
            let rate = body
                .rates
                .get(code)
                .copied()
                .ok_or_else(|| RatesError::Malformed(format!("missing rate for {}", code)))?;
            if !rate.is_finite() || rate <= 0.0 {
                return Err(RatesError::Malformed(format!("invalid rate for {}: {}", code, rate)));
            }
            rates.insert(code.to_string(), rate);
        }
        Ok(rates)
    }

    async fn crypto_price(&self, symbol: &str) -> RatesResult<f64> {
        let body: PriceResponse = self
            .client
            .get(&self.crypto_api_url)
            .query(&[
                ("fsym", symbol),
                ("tsyms", "USD"),
                ("api_key", self.crypto_api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match body.usd {
            Some(price) if price.is_finite() && price > 0.0 => Ok(price),
            Some(price) => Err(RatesError::Malformed(format!("invalid {} price: {}", symbol, price))),
            None => Err(RatesError::Malformed(format!("no USD price for {}", symbol))),
        }
    }
}

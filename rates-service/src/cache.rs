//! Snapshot cache in front of the quote source.
//!
//! Each dataset (exchange rates, crypto prices) has one snapshot behind its
//! own async mutex. A caller that finds the snapshot expired refreshes it
//! while holding the lock, so concurrent callers queue behind a single
//! refresh and then read its result. Failed refreshes store the static
//! fallback too, which keeps the upstream API from being hammered while it
//! is down.

use crate::config::RatesConfig;
use crate::error::RatesResult;
use crate::retry::RetryPolicy;
use crate::source::{HttpQuoteSource, QuoteSource};
use crate::tables::{static_crypto_prices, static_exchange_rates, STATIC_CRYPTO_PRICES};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Values served to callers, with whether they came from the live API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub values: BTreeMap<String, f64>,
    pub is_live: bool,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    fn live(values: BTreeMap<String, f64>) -> Self {
        Self {
            values,
            is_live: true,
            timestamp: Utc::now(),
        }
    }

    fn fallback(values: BTreeMap<String, f64>) -> Self {
        Self {
            values,
            is_live: false,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Snapshot {
    quote: Quote,
    refreshed_at: Instant,
}

pub struct RateCache {
    source: Arc<dyn QuoteSource>,
    policy: RetryPolicy,
    ttl: Duration,
    exchange: Mutex<Option<Snapshot>>,
    crypto: Mutex<Option<Snapshot>>,
}

impl RateCache {
    pub fn new(source: Arc<dyn QuoteSource>, policy: RetryPolicy, ttl: Duration) -> Self {
        Self {
            source,
            policy,
            ttl,
            exchange: Mutex::new(None),
            crypto: Mutex::new(None),
        }
    }

    /// Cache over the HTTP APIs named in `config`.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn from_config(config: &RatesConfig) -> RatesResult<Self> {
        let source = HttpQuoteSource::new(config)?;
        Ok(Self::new(
            Arc::new(source),
            RetryPolicy::from(config),
            config.cache_ttl(),
        ))
    }

    /// USD-based exchange rates. Never fails; falls back to the static table.
    pub async fn exchange_rates(&self) -> Quote {
        let mut slot = self.exchange.lock().await;
        if let Some(snapshot) = self.fresh(&slot) {
            return snapshot;
        }

        let quote = self.refresh_exchange().await;
        *slot = Some(Snapshot {
            quote: quote.clone(),
            refreshed_at: Instant::now(),
        });
        quote
    }

    /// USD crypto prices. Never fails; symbols that cannot be fetched use
    /// their static price.
    pub async fn crypto_prices(&self) -> Quote {
        let mut slot = self.crypto.lock().await;
        if let Some(snapshot) = self.fresh(&slot) {
            return snapshot;
        }

        let quote = self.refresh_crypto().await;
        *slot = Some(Snapshot {
            quote: quote.clone(),
            refreshed_at: Instant::now(),
        });
        quote
    }

    fn fresh(&self, slot: &Option<Snapshot>) -> Option<Quote> {
        slot.as_ref()
            .filter(|snapshot| snapshot.refreshed_at.elapsed() < self.ttl)
            .map(|snapshot| snapshot.quote.clone())
    }

    async fn refresh_exchange(&self) -> Quote {
        match self
            .policy
            .run("exchange rates", || self.source.exchange_rates())
            .await
        {
            Ok(rates) => {
                info!(currencies = rates.len(), "Exchange rates refreshed");
                Quote::live(rates)
            }
            Err(e) => {
                warn!(error = %e, "Exchange rate refresh failed, serving static rates");
                Quote::fallback(static_exchange_rates())
            }
        }
    }

    async fn refresh_crypto(&self) -> Quote {
        let fetches = STATIC_CRYPTO_PRICES.iter().map(|(symbol, fallback)| async move {
            let result = self
                .policy
                .run(symbol, || self.source.crypto_price(symbol))
                .await;
            (*symbol, *fallback, result)
        });
        let results = join_all(fetches).await;

        let live = results.iter().filter(|(_, _, result)| result.is_ok()).count();
        if live == 0 {
            warn!("Crypto price refresh failed for every symbol, serving static prices");
            return Quote::fallback(static_crypto_prices());
        }

        let mut prices = BTreeMap::new();
        for (symbol, fallback, result) in results {
            let price = match result {
                Ok(price) => price,
                Err(e) => {
                    warn!(symbol, error = %e, "Using static price");
                    fallback
                }
            };
            prices.insert(symbol.to_string(), price);
        }

        let all_live = live == STATIC_CRYPTO_PRICES.len();
        info!(live, total = STATIC_CRYPTO_PRICES.len(), "Crypto prices refreshed");
        if all_live {
            Quote::live(prices)
        } else {
            Quote::fallback(prices)
        }
    }
}

use async_trait::async_trait;
use rates_service::{
    static_crypto_prices, static_exchange_rates, QuoteSource, RateCache, RatesError, RatesResult,
    RetryPolicy,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts calls; fails on demand
#[derive(Default)]
struct FakeSource {
    exchange_calls: AtomicU32,
    crypto_calls: AtomicU32,
    exchange_down: AtomicBool,
    failing_symbols: Vec<&'static str>,
    latency: Duration,
}

impl FakeSource {
    fn failing_symbols(symbols: &[&'static str]) -> Self {
        Self {
            failing_symbols: symbols.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl QuoteSource for FakeSource {
    async fn exchange_rates(&self) -> RatesResult<BTreeMap<String, f64>> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.exchange_down.load(Ordering::SeqCst) {
            return Err(RatesError::Network("connection refused".to_string()));
        }
        let mut rates = static_exchange_rates();
        rates.insert("EUR".to_string(), 0.92);
        Ok(rates)
    }

    async fn crypto_price(&self, symbol: &str) -> RatesResult<f64> {
        self.crypto_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_symbols.iter().any(|failing| *failing == symbol) {
            return Err(RatesError::Status(500));
        }
        Ok(static_crypto_prices().get(symbol).copied().unwrap_or(1.0) * 2.0)
    }
}

fn cache(source: Arc<FakeSource>) -> RateCache {
    RateCache::new(source, RetryPolicy::default(), Duration::from_secs(30))
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_reused_within_ttl() {
    let source = Arc::new(FakeSource::default());
    let cache = cache(source.clone());

    let first = cache.exchange_rates().await;
    assert!(first.is_live);
    assert_eq!(first.values["EUR"], 0.92);

    tokio::time::advance(Duration::from_secs(29)).await;
    let second = cache.exchange_rates().await;

    assert_eq!(second, first);
    assert_eq!(source.exchange_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_snapshot_refreshes_once() {
    let source = Arc::new(FakeSource::default());
    let cache = cache(source.clone());

    cache.exchange_rates().await;
    tokio::time::advance(Duration::from_secs(31)).await;
    cache.exchange_rates().await;
    cache.exchange_rates().await;

    assert_eq!(source.exchange_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_cold_callers_share_one_refresh() {
    let source = Arc::new(FakeSource {
        latency: Duration::from_millis(200),
        ..FakeSource::default()
    });
    let cache = cache(source.clone());

    let (a, b, c) = tokio::join!(cache.exchange_rates(), cache.exchange_rates(), cache.exchange_rates());

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(source.exchange_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unreachable_api_falls_back_to_static_rates() {
    let source = Arc::new(FakeSource::default());
    source.exchange_down.store(true, Ordering::SeqCst);
    let cache = cache(source.clone());

    let quote = cache.exchange_rates().await;

    assert!(!quote.is_live);
    assert_eq!(quote.values, static_exchange_rates());
    assert_eq!(source.exchange_calls.load(Ordering::SeqCst), 3);

    // the fallback is cached for a full window
    tokio::time::advance(Duration::from_secs(10)).await;
    let again = cache.exchange_rates().await;
    assert!(!again.is_live);
    assert_eq!(source.exchange_calls.load(Ordering::SeqCst), 3);

    // and the API is tried again once the window has passed
    source.exchange_down.store(false, Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(31)).await;
    let recovered = cache.exchange_rates().await;
    assert!(recovered.is_live);
    assert_eq!(source.exchange_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn crypto_prices_all_live() {
    let source = Arc::new(FakeSource::default());
    let cache = cache(source.clone());

    let quote = cache.crypto_prices().await;

    assert!(quote.is_live);
    assert_eq!(quote.values["BTC"], 70000.0);
    assert_eq!(quote.values.len(), 4);
    assert_eq!(source.crypto_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn failing_symbol_uses_its_static_price() {
    let source = Arc::new(FakeSource::failing_symbols(&["ETH"]));
    let cache = cache(source.clone());

    let quote = cache.crypto_prices().await;

    assert!(!quote.is_live);
    assert_eq!(quote.values["ETH"], 2000.0);
    assert_eq!(quote.values["BTC"], 70000.0);
    // three symbols once, ETH three times
    assert_eq!(source.crypto_calls.load(Ordering::SeqCst), 6);
}

#[tokio::test(start_paused = true)]
async fn all_symbols_failing_returns_static_table() {
    let source = Arc::new(FakeSource::failing_symbols(&["BTC", "ETH", "USDT", "USDC"]));
    let cache = cache(source.clone());

    let quote = cache.crypto_prices().await;

    assert!(!quote.is_live);
    assert_eq!(quote.values, static_crypto_prices());

    cache.crypto_prices().await;
    assert_eq!(source.crypto_calls.load(Ordering::SeqCst), 12);
}

use rates_service::{HttpQuoteSource, QuoteSource, RateCache, RatesConfig, RatesError};

fn config(server: &mockito::Server) -> RatesConfig {
    RatesConfig {
        exchange_api_url: format!("{}/v4/latest", server.url()),
        crypto_api_url: format!("{}/data/price", server.url()),
        crypto_api_key: Some("test-key".to_string()),
        retry_backoff_ms: 10,
        ..RatesConfig::default()
    }
}

const FULL_RATES: &str = r#"{
    "base": "USD",
    "rates": {"USD": 1.0, "EUR": 0.91, "GBP": 0.79, "JPY": 151.2, "CAD": 1.36, "AUD": 1.52, "CNY": 7.23, "CHF": 0.9}
}"#;

#[tokio::test]
async fn parses_exchange_rates_for_tracked_currencies() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v4/latest/USD")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(FULL_RATES)
        .create_async()
        .await;

    let source = HttpQuoteSource::new(&config(&server)).unwrap();
    let rates = source.exchange_rates().await.unwrap();

    mock.assert_async().await;
    assert_eq!(rates.len(), 7);
    assert_eq!(rates["EUR"], 0.91);
    assert!(!rates.contains_key("CHF"));
}

#[tokio::test]
async fn payload_missing_a_currency_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v4/latest/USD")
        .with_status(200)
        .with_body(r#"{"rates": {"USD": 1.0, "EUR": 0.91}}"#)
        .create_async()
        .await;

    let source = HttpQuoteSource::new(&config(&server)).unwrap();
    let err = source.exchange_rates().await.unwrap_err();

    assert!(matches!(err, RatesError::Malformed(_)));
}

#[tokio::test]
async fn server_error_is_a_status_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v4/latest/USD")
        .with_status(503)
        .create_async()
        .await;

    let source = HttpQuoteSource::new(&config(&server)).unwrap();
    let err = source.exchange_rates().await.unwrap_err();

    assert!(matches!(err, RatesError::Status(503)));
}

#[tokio::test]
async fn crypto_price_sends_symbol_and_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/data/price")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("fsym".into(), "BTC".into()),
            mockito::Matcher::UrlEncoded("tsyms".into(), "USD".into()),
            mockito::Matcher::UrlEncoded("api_key".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"USD": 64123.5}"#)
        .create_async()
        .await;

    let source = HttpQuoteSource::new(&config(&server)).unwrap();
    let price = source.crypto_price("BTC").await.unwrap();

    mock.assert_async().await;
    assert_eq!(price, 64123.5);
}

#[tokio::test]
async fn crypto_error_payload_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/data/price")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"Response": "Error", "Message": "fsym param is invalid"}"#)
        .create_async()
        .await;

    let source = HttpQuoteSource::new(&config(&server)).unwrap();
    let err = source.crypto_price("XYZ").await.unwrap_err();

    assert!(matches!(err, RatesError::Malformed(_)));
}

#[tokio::test]
async fn cache_retries_then_serves_static_rates() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v4/latest/USD")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let cache = RateCache::from_config(&config(&server)).unwrap();
    let quote = cache.exchange_rates().await;

    mock.assert_async().await;
    assert!(!quote.is_live);
    assert_eq!(quote.values, rates_service::static_exchange_rates());
}

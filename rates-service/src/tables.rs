// Reference values served whenever the live APIs cannot be reached
use std::collections::BTreeMap;

/// Units of each currency per 1 USD
pub const STATIC_EXCHANGE_RATES: [(&str, f64); 7] = [
    ("USD", 1.0),
    ("EUR", 0.85),
    ("GBP", 0.73),
    ("JPY", 110.0),
    ("CAD", 1.25),
    ("AUD", 1.35),
    ("CNY", 6.45),
];

/// USD price per coin
pub const STATIC_CRYPTO_PRICES: [(&str, f64); 4] = [
    ("BTC", 35000.00),
    ("ETH", 2000.00),
    ("USDT", 1.00),
    ("USDC", 1.00),
];

pub fn static_exchange_rates() -> BTreeMap<String, f64> {
    to_map(&STATIC_EXCHANGE_RATES)
}

pub fn static_crypto_prices() -> BTreeMap<String, f64> {
    to_map(&STATIC_CRYPTO_PRICES)
}

/// Currencies an exchange-rate payload must cover
pub fn tracked_currencies() -> impl Iterator<Item = &'static str> {
    STATIC_EXCHANGE_RATES.iter().map(|(code, _)| *code)
}

fn to_map(table: &[(&str, f64)]) -> BTreeMap<String, f64> {
    table
        .iter()
        .map(|(code, value)| ((*code).to_string(), *value))
        .collect()
}

use crate::server::BillingDogServer;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExchangeRatesResponse {
    pub success: bool,
    /// Units of each currency per 1 USD
    pub rates: BTreeMap<String, f64>,
    /// `false` when the static table is being served
    pub is_live: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CryptoPricesResponse {
    pub success: bool,
    /// USD price per coin
    pub prices: BTreeMap<String, f64>,
    /// `false` when any price comes from the static table
    pub is_live: bool,
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/get_exchange_rates",
    tag = "rates",
    responses(
        (status = 200, description = "Exchange rates, live or fallback", body = ExchangeRatesResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_exchange_rates(State(server): State<BillingDogServer>) -> Json<ExchangeRatesResponse> {
    let quote = server.rates.exchange_rates().await;
    Json(ExchangeRatesResponse {
        success: true,
        rates: quote.values,
        is_live: quote.is_live,
        timestamp: quote.timestamp,
    })
}

#[utoipa::path(
    get,
    path = "/get_crypto_prices",
    tag = "rates",
    responses(
        (status = 200, description = "Crypto prices, live or fallback", body = CryptoPricesResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_crypto_prices(State(server): State<BillingDogServer>) -> Json<CryptoPricesResponse> {
    let quote = server.rates.crypto_prices().await;
    Json(CryptoPricesResponse {
        success: true,
        prices: quote.values,
        is_live: quote.is_live,
        timestamp: quote.timestamp,
    })
}

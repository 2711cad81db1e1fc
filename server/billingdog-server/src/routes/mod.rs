pub mod paths;

use crate::{
    handlers::{bills, claims, health, rates},
    middleware::enforce_rate_limit,
    openapi,
    server::BillingDogServer,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

/// Create health check routes
pub fn health_routes() -> Router<BillingDogServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Create the rate routes, each behind its own limiter
pub fn rate_routes(server: &BillingDogServer) -> Router<BillingDogServer> {
    let exchange = Router::new()
        .route(paths::rates::EXCHANGE_RATES, get(rates::get_exchange_rates))
        .route_layer(from_fn_with_state(
            server.exchange_limiter.clone(),
            enforce_rate_limit,
        ));

    let crypto = Router::new()
        .route(paths::rates::CRYPTO_PRICES, get(rates::get_crypto_prices))
        .route_layer(from_fn_with_state(
            server.crypto_limiter.clone(),
            enforce_rate_limit,
        ));

    exchange.merge(crypto)
}

/// Create bill routes
pub fn bill_routes() -> Router<BillingDogServer> {
    Router::new()
        .route(
            paths::bills::BILLS,
            get(bills::list_bills).post(bills::create_bill),
        )
        .route(
            paths::bills::BILL_BY_ID,
            get(bills::get_bill).delete(bills::delete_bill),
        )
        .route(paths::bills::BILL_CLAIMS, get(bills::list_bill_claims))
        .route(paths::bills::BILL_INVOICE, get(bills::download_invoice))
}

/// Create claim submission routes
pub fn claim_routes() -> Router<BillingDogServer> {
    Router::new().route(paths::claims::SUBMIT_CLAIM, post(claims::submit_claim))
}

/// Create all application routes
pub fn create_routes(server: &BillingDogServer) -> Router<BillingDogServer> {
    Router::new()
        .merge(health_routes())
        .merge(rate_routes(server))
        .merge(bill_routes())
        .merge(claim_routes())
        .route(paths::docs::OPENAPI_JSON, get(openapi::openapi_json))
}

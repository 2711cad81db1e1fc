//! BillingDog Server - healthcare billing HTTP API
//!
//! This library provides the HTTP surface of BillingDog: bill CRUD and PDF
//! invoices, insurance claim submission, and rate-limited exchange-rate and
//! crypto-price lookups.

#[macro_use]
pub mod validation;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::*;
pub use server::BillingDogServer;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: BillingDogServer) -> Router {
    routes::create_routes(&server)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(&server.config.server.cors_origins))
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}

//! Exchange rates and crypto prices for BillingDog
//!
//! [`RateCache`] serves USD exchange rates and crypto prices from a
//! 30-second snapshot, refreshing from a [`QuoteSource`] with bounded retry
//! and falling back to the static tables in [`tables`] when the upstream
//! APIs are unavailable. Callers always get an answer; `is_live` tells them
//! whether it is fresh.

pub mod cache;
pub mod config;
pub mod error;
pub mod retry;
pub mod source;
pub mod tables;

pub use cache::{Quote, RateCache};
pub use config::RatesConfig;
pub use error::{RatesError, RatesResult};
pub use retry::RetryPolicy;
pub use source::{HttpQuoteSource, QuoteSource};
pub use tables::{static_crypto_prices, static_exchange_rates};

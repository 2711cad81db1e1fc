//! Centralized API route path constants
//!
//! utoipa `#[path(...)]` attributes need string literals, so handlers repeat
//! these values; keep both in step.

/// Health check endpoints
pub mod health {
    pub const HEALTH: &str = "/health";
}

/// Reference rate endpoints (rate limited)
pub mod rates {
    pub const EXCHANGE_RATES: &str = "/get_exchange_rates";
    pub const CRYPTO_PRICES: &str = "/get_crypto_prices";
}

/// Bill endpoints
pub mod bills {
    pub const BILLS: &str = "/api/bills";
    pub const BILL_BY_ID: &str = "/api/bills/:id";
    pub const BILL_CLAIMS: &str = "/api/bills/:id/claims";
    pub const BILL_INVOICE: &str = "/api/bills/:id/invoice";
}

/// Insurance claim endpoints
pub mod claims {
    pub const SUBMIT_CLAIM: &str = "/api/submit_claim";
}

/// API documentation
pub mod docs {
    pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
}

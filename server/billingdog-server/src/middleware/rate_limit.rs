//! Sliding-window rate limiting for the public rate endpoints.
//!
//! Every guarded endpoint owns a [`RateLimiter`]. The limiter keeps, per
//! client address, the instants of the requests it accepted inside the
//! current window; a request is rejected once the window already holds
//! `max_requests` of them.

use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use logger_redacted::redacted_warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_seconds: u64,
    /// Client table size above which idle clients are swept
    pub sweep_threshold: usize,
    /// Key clients by `X-Forwarded-For`/`X-Real-IP`. Only safe behind a
    /// proxy that overwrites them.
    pub trust_forwarded_headers: bool,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_seconds: 60,
            sweep_threshold: 10_000,
            trust_forwarded_headers: true,
            enabled: true,
        }
    }
}

pub struct RateLimiter {
    name: &'static str,
    entries: RwLock<HashMap<String, VecDeque<Instant>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn trusts_forwarded_headers(&self) -> bool {
        self.config.trust_forwarded_headers
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds.max(1))
    }

    /// Record a request from `key`, or reject it.
    ///
    /// # Errors
    ///
    /// [`ApiError::RateLimit`] with the whole seconds until the oldest
    /// request in the window expires, between 1 and the window length.
    pub async fn check(&self, key: &str) -> Result<(), ApiError> {
        if !self.config.enabled {
            return Ok(());
        }

        let window = self.window();
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        // Clean up idle clients once the table gets large
        if entries.len() > self.config.sweep_threshold {
            entries.retain(|_, hits| {
                hits.back()
                    .is_some_and(|last| now.duration_since(*last) < window)
            });
        }

        let hits = entries.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= window)
        {
            hits.pop_front();
        }

        let limit = usize::try_from(self.config.max_requests).unwrap_or(usize::MAX);
        if hits.len() >= limit {
            let oldest = hits.front().copied().unwrap_or(now);
            let remaining = window.saturating_sub(now.duration_since(oldest));
            let seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(ApiError::RateLimit {
                retry_after: seconds.clamp(1, window.as_secs()),
            });
        }

        hits.push_back(now);
        Ok(())
    }

    /// Requests `key` may still make in the current window
    pub async fn remaining(&self, key: &str) -> u32 {
        let window = self.window();
        let now = Instant::now();
        let entries = self.entries.read().await;
        let used = entries.get(key).map_or(0, |hits| {
            hits.iter()
                .filter(|hit| now.duration_since(**hit) < window)
                .count()
        });
        self.config
            .max_requests
            .saturating_sub(u32::try_from(used).unwrap_or(u32::MAX))
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Client identity for rate limiting: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer. With `trust_forwarded` off only the
/// peer counts.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let forwarded = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    trust_forwarded
        .then(|| forwarded("X-Forwarded-For").or_else(|| forwarded("X-Real-IP")))
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware guarding a route with the limiter in its state
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, limiter.trusts_forwarded_headers());

    if let Err(e) = limiter.check(&key).await {
        redacted_warn!("Rate limit exceeded on {} for client {}", limiter.name(), key);
        return Err(e);
    }

    Ok(next.run(request).await)
}

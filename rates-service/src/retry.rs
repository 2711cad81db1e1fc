use crate::config::RatesConfig;
use crate::error::{RatesError, RatesResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with doubling backoff and a per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&RatesConfig> for RetryPolicy {
    fn from(config: &RatesConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
            attempt_timeout: config.request_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the attempts are used up, returning the
    /// last error in the latter case.
    ///
    /// # Errors
    ///
    /// The error of the final attempt; [`RatesError::Timeout`] if that attempt
    /// ran past `attempt_timeout`.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> RatesResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RatesResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(RatesError::Timeout),
            };

            match result {
                Ok(value) => {
                    debug!(what, attempt, "Fetch succeeded");
                    return Ok(value);
                }
                Err(e) if attempt >= attempts => {
                    warn!(what, attempt, error = %e, "Giving up after final attempt");
                    return Err(e);
                }
                Err(e) => {
                    warn!(what, attempt, error = %e, "Fetch failed, retrying in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn backs_off_one_then_two_seconds() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: RatesResult<()> = RetryPolicy::default()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RatesError::Status(503))
            })
            .await;

        assert!(matches!(result, Err(RatesError::Status(503))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let calls = AtomicU32::new(0);

        let value = RetryPolicy::default()
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RatesError::Network("connection reset".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };

        let result: RatesResult<()> = policy
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(RatesError::Timeout)));
    }
}

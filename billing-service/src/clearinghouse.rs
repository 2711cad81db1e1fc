use crate::edi::EdiInterchange;
use async_trait::async_trait;
use logger_redacted::redacted_debug;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const ACCEPTED_MESSAGE: &str = "Claim accepted for processing";

/// Failure reported by a clearinghouse; the message is surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClearinghouseRejection {
    pub message: String,
}

impl ClearinghouseRejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Clearinghouse: Send + Sync {
    /// Transmit an interchange, returning the clearinghouse's acknowledgement.
    async fn submit(&self, edi: &EdiInterchange) -> Result<String, ClearinghouseRejection>;
}

/// Stand-in clearinghouse that accepts every claim after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedClearinghouse {
    latency: Duration,
}

impl SimulatedClearinghouse {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedClearinghouse {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Clearinghouse for SimulatedClearinghouse {
    async fn submit(&self, edi: &EdiInterchange) -> Result<String, ClearinghouseRejection> {
        info!(segments = edi.segments().len(), "Simulating claim submission to clearinghouse");
        redacted_debug!("EDI content:\n{}", edi);

        tokio::time::sleep(self.latency).await;

        Ok(ACCEPTED_MESSAGE.to_string())
    }
}

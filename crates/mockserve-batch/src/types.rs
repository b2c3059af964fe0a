//! Coordinator types.

use std::time::Duration;

use mockserve_core::{BatchSettings, Error, Result};
use serde::Serialize;

/// Opaque correlation identifier supplied by the caller.
pub type Token = String;

/// Timing and randomness parameters for a [`crate::Coordinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Submission silence that closes the current batch.
    pub quiet_period: Duration,
    /// Shortest per-token redispatch delay.
    pub jitter_min: Duration,
    /// Longest per-token redispatch delay (inclusive).
    pub jitter_max: Duration,
    /// Fixed RNG seed for reproducible shuffles and delays.
    pub seed: Option<u64>,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jitter_min > self.jitter_max {
            return Err(Error::Config(format!(
                "jitter_min ({:?}) exceeds jitter_max ({:?})",
                self.jitter_min, self.jitter_max
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&BatchSettings::default())
    }
}

impl From<&BatchSettings> for BatchConfig {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            quiet_period: settings.quiet_period(),
            jitter_min: settings.jitter_min(),
            jitter_max: settings.jitter_max(),
            seed: None,
        }
    }
}

/// Lifecycle phase of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing buffered, nothing awaiting redispatch.
    Idle,
    /// Tokens buffered, idle timer armed.
    Accumulating,
    /// Batch closed, per-token redispatch timers still armed.
    Draining,
}

/// Point-in-time counters for a coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub phase: Phase,
    /// Tokens submitted since the last batch closed.
    pub buffered: usize,
    /// Tokens from closed batches not yet redispatched.
    #[serde(rename = "inFlight")]
    pub in_flight: usize,
    /// Callers currently suspended on a token.
    #[serde(rename = "pendingWaits")]
    pub pending_waits: usize,
    #[serde(rename = "batchesClosed")]
    pub batches_closed: u64,
    #[serde(rename = "tokensSubmitted")]
    pub tokens_submitted: u64,
    #[serde(rename = "tokensRedispatched")]
    pub tokens_redispatched: u64,
}

impl Phase {
    pub(crate) fn derive(buffered: usize, in_flight: usize) -> Self {
        if buffered > 0 {
            Phase::Accumulating
        } else if in_flight > 0 {
            Phase::Draining
        } else {
            Phase::Idle
        }
    }
}

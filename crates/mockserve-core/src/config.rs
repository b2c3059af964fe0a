//! Configuration loaded from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_QUIET_MS: u64 = 1000;
const DEFAULT_JITTER_MIN_MS: u64 = 1000;
const DEFAULT_JITTER_MAX_MS: u64 = 3000;
const DEFAULT_SLOW_DELAY_MS: u64 = 2000;

/// Timing parameters for the stats batching coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Submission silence (ms) that closes a batch.
    #[serde(rename = "quietPeriodMs")]
    pub quiet_period_ms: u64,
    /// Lower bound (ms) of the per-token redispatch delay.
    #[serde(rename = "jitterMinMs")]
    pub jitter_min_ms: u64,
    /// Upper bound (ms) of the per-token redispatch delay.
    #[serde(rename = "jitterMaxMs")]
    pub jitter_max_ms: u64,
}

impl BatchSettings {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn jitter_min(&self) -> Duration {
        Duration::from_millis(self.jitter_min_ms)
    }

    pub fn jitter_max(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            quiet_period_ms: DEFAULT_QUIET_MS,
            jitter_min_ms: DEFAULT_JITTER_MIN_MS,
            jitter_max_ms: DEFAULT_JITTER_MAX_MS,
        }
    }
}

/// Top-level MockServe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockServeConfig {
    /// HTTP server port.
    pub port: u16,
    /// Batching coordinator timing.
    pub batch: BatchSettings,
    /// Upper bound on how long `/stats` waits for its token. `None` waits forever.
    pub stats_timeout_ms: Option<u64>,
    /// Latency of the fixed-delay endpoint.
    pub slow_delay_ms: u64,
}

impl MockServeConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_var(&lookup, "PORT").unwrap_or(DEFAULT_PORT);

        let batch = BatchSettings {
            quiet_period_ms: parse_var(&lookup, "BATCH_QUIET_MS").unwrap_or(DEFAULT_QUIET_MS),
            jitter_min_ms: parse_var(&lookup, "BATCH_JITTER_MIN_MS")
                .unwrap_or(DEFAULT_JITTER_MIN_MS),
            jitter_max_ms: parse_var(&lookup, "BATCH_JITTER_MAX_MS")
                .unwrap_or(DEFAULT_JITTER_MAX_MS),
        };

        if batch.jitter_min_ms > batch.jitter_max_ms {
            return Err(Error::Config(format!(
                "BATCH_JITTER_MIN_MS ({}) exceeds BATCH_JITTER_MAX_MS ({})",
                batch.jitter_min_ms, batch.jitter_max_ms
            )));
        }

        Ok(Self {
            port,
            batch,
            stats_timeout_ms: parse_var(&lookup, "STATS_TIMEOUT_MS"),
            slow_delay_ms: parse_var(&lookup, "SLOW_DELAY_MS").unwrap_or(DEFAULT_SLOW_DELAY_MS),
        })
    }

    pub fn stats_timeout(&self) -> Option<Duration> {
        self.stats_timeout_ms.map(Duration::from_millis)
    }

    pub fn slow_delay(&self) -> Duration {
        Duration::from_millis(self.slow_delay_ms)
    }
}

impl Default for MockServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            batch: BatchSettings::default(),
            stats_timeout_ms: None,
            slow_delay_ms: DEFAULT_SLOW_DELAY_MS,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}, using default", key, raw);
            None
        }
    }
}

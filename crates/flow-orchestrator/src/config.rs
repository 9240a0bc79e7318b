//! Orchestrator configuration.

use crate::domain::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Complete orchestrator configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub retry: RetryPolicy,
    pub barrier: BarrierConfig,
    pub tracker: TrackerConfig,
    pub pacing: PacingConfig,
}

/// Pending-operation barrier polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierConfig {
    pub poll_interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_wait_ms: 30_000,
        }
    }
}

impl BarrierConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Confirmation polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub poll_interval_ms: u64,
    /// Used only for the time-left estimate
    pub seconds_per_block: u64,
    /// Poll budget per tracked handle
    pub max_ticks: u32,
    pub default_required_confirmations: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            seconds_per_block: 12,
            max_ticks: 600,
            default_required_confirmations: 1,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Delay between consecutive steps. Always awaited.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub inter_step_delay_ms: u64,
}

impl PacingConfig {
    pub fn inter_step_delay(&self) -> Option<Duration> {
        (self.inter_step_delay_ms > 0).then(|| Duration::from_millis(self.inter_step_delay_ms))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("retry.max_retries must be at least 1")]
    ZeroRetries,

    #[error("retry.backoff_factor must be a finite value >= 1.0, got {0}")]
    BackoffFactor(String),

    #[error("retry.max_delay_ms ({max}) is below retry.initial_delay_ms ({initial})")]
    DelayCeiling { initial: u64, max: u64 },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        let factor = self.retry.backoff_factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(ConfigError::BackoffFactor(factor.to_string()));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::DelayCeiling {
                initial: self.retry.initial_delay_ms,
                max: self.retry.max_delay_ms,
            });
        }
        if self.barrier.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("barrier.poll_interval_ms"));
        }
        if self.tracker.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("tracker.poll_interval_ms"));
        }
        if self.tracker.max_ticks == 0 {
            return Err(ConfigError::ZeroValue("tracker.max_ticks"));
        }
        Ok(())
    }
}

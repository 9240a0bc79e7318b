//! Runtime configuration: orchestrator defaults overridden from `FLOW_*`
//! environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FLOW_MAX_RETRIES` | `retry.max_retries` |
//! | `FLOW_INITIAL_DELAY_MS` | `retry.initial_delay_ms` |
//! | `FLOW_BACKOFF_FACTOR` | `retry.backoff_factor` |
//! | `FLOW_MAX_DELAY_MS` | `retry.max_delay_ms` |
//! | `FLOW_BARRIER_POLL_MS` | `barrier.poll_interval_ms` |
//! | `FLOW_BARRIER_MAX_WAIT_MS` | `barrier.max_wait_ms` |
//! | `FLOW_TRACKER_POLL_MS` | `tracker.poll_interval_ms` |
//! | `FLOW_SECONDS_PER_BLOCK` | `tracker.seconds_per_block` |
//! | `FLOW_MAX_POLL_TICKS` | `tracker.max_ticks` |
//! | `FLOW_REQUIRED_CONFIRMATIONS` | `tracker.default_required_confirmations` |
//! | `FLOW_STEP_DELAY_MS` | `pacing.inter_step_delay_ms` |
//! | `FLOW_BLOCK_TIME_MS` | simulated block interval |

use flow_orchestrator::OrchestratorConfig;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Everything the runtime binary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub orchestrator: OrchestratorConfig,
    /// Interval of the simulated block producer
    pub block_time_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            block_time_ms: 1000,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults plus whatever `lookup` returns for each variable.
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let o = &mut config.orchestrator;

        apply(&lookup, "FLOW_MAX_RETRIES", &mut o.retry.max_retries);
        apply(&lookup, "FLOW_INITIAL_DELAY_MS", &mut o.retry.initial_delay_ms);
        apply(&lookup, "FLOW_BACKOFF_FACTOR", &mut o.retry.backoff_factor);
        apply(&lookup, "FLOW_MAX_DELAY_MS", &mut o.retry.max_delay_ms);
        apply(&lookup, "FLOW_BARRIER_POLL_MS", &mut o.barrier.poll_interval_ms);
        apply(&lookup, "FLOW_BARRIER_MAX_WAIT_MS", &mut o.barrier.max_wait_ms);
        apply(&lookup, "FLOW_TRACKER_POLL_MS", &mut o.tracker.poll_interval_ms);
        apply(&lookup, "FLOW_SECONDS_PER_BLOCK", &mut o.tracker.seconds_per_block);
        apply(&lookup, "FLOW_MAX_POLL_TICKS", &mut o.tracker.max_ticks);
        apply(
            &lookup,
            "FLOW_REQUIRED_CONFIRMATIONS",
            &mut o.tracker.default_required_confirmations,
        );
        apply(&lookup, "FLOW_STEP_DELAY_MS", &mut o.pacing.inter_step_delay_ms);
        apply(&lookup, "FLOW_BLOCK_TIME_MS", &mut config.block_time_ms);

        config
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms.max(1))
    }
}

/// Overwrite `target` when `key` is set and parses; warn and keep the
/// default otherwise.
fn apply<L, T>(lookup: &L, key: &str, target: &mut T)
where
    L: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            info!(key, ?value, "Config override from environment");
            *target = value;
        }
        Err(_) => warn!(key, value = %raw, "Ignoring unparsable config override"),
    }
}

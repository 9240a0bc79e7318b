//! # Workflow Metrics
//!
//! Prometheus metrics for retry, polling and run outcomes.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! flow-orchestrator = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `workflow_retry_attempts_total` - Counter of re-invocations after a conflict
//! - `workflow_conflicts_total` - Counter of ordering conflicts observed
//! - `workflow_retries_exhausted_total` - Counter of calls that ran out of attempts
//! - `workflow_barrier_timeouts_total` - Counter of barrier waits that hit the cap
//! - `workflow_confirmation_polls_total` - Counter of tracker poll ticks
//! - `workflow_dropped_handles_total` - Counter of tracked handles that disappeared
//! - `workflow_steps_total` - Counter of finished steps (by outcome)
//! - `workflow_runs_total` - Counter of finished runs (by outcome)
//! - `workflow_active_trackers` - Gauge of running confirmation trackers

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, register_int_gauge};
#[cfg(feature = "metrics")]
use prometheus::{IntCounter, IntCounterVec, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref RETRY_ATTEMPTS: IntCounter = register_int_counter!(
        "workflow_retry_attempts_total",
        "Total number of re-invocations after an ordering conflict"
    )
    .expect("Failed to create RETRY_ATTEMPTS metric");

    pub static ref CONFLICTS: IntCounter = register_int_counter!(
        "workflow_conflicts_total",
        "Total number of ordering conflicts observed"
    )
    .expect("Failed to create CONFLICTS metric");

    pub static ref RETRIES_EXHAUSTED: IntCounter = register_int_counter!(
        "workflow_retries_exhausted_total",
        "Total number of retried calls that ran out of attempts"
    )
    .expect("Failed to create RETRIES_EXHAUSTED metric");

    pub static ref BARRIER_TIMEOUTS: IntCounter = register_int_counter!(
        "workflow_barrier_timeouts_total",
        "Total number of pending-barrier waits that hit their cap"
    )
    .expect("Failed to create BARRIER_TIMEOUTS metric");

    pub static ref CONFIRMATION_POLLS: IntCounter = register_int_counter!(
        "workflow_confirmation_polls_total",
        "Total number of confirmation poll ticks"
    )
    .expect("Failed to create CONFIRMATION_POLLS metric");

    pub static ref DROPPED_HANDLES: IntCounter = register_int_counter!(
        "workflow_dropped_handles_total",
        "Total number of tracked handles that disappeared before confirmation"
    )
    .expect("Failed to create DROPPED_HANDLES metric");

    /// Finished steps, labeled by outcome
    pub static ref STEPS: IntCounterVec = register_int_counter_vec!(
        "workflow_steps_total",
        "Total number of steps that reached a terminal status",
        &["outcome"]
    )
    .expect("Failed to create STEPS metric");

    /// Finished runs, labeled by outcome
    pub static ref RUNS: IntCounterVec = register_int_counter_vec!(
        "workflow_runs_total",
        "Total number of workflow runs finished",
        &["outcome"]
    )
    .expect("Failed to create RUNS metric");

    pub static ref ACTIVE_TRACKERS: IntGauge = register_int_gauge!(
        "workflow_active_trackers",
        "Number of confirmation trackers currently polling"
    )
    .expect("Failed to create ACTIVE_TRACKERS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_retry_attempt() {
    RETRY_ATTEMPTS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_conflict() {
    CONFLICTS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_retries_exhausted() {
    RETRIES_EXHAUSTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_barrier_timeout() {
    BARRIER_TIMEOUTS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_confirmation_poll() {
    CONFIRMATION_POLLS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_dropped_handle() {
    DROPPED_HANDLES.inc();
}

/// Record a step reaching `completed` or `failed`
#[cfg(feature = "metrics")]
pub fn record_step_outcome(outcome: &str) {
    STEPS.with_label_values(&[outcome]).inc();
}

/// Record a run finishing with `success` or `failure`
#[cfg(feature = "metrics")]
pub fn record_run_outcome(outcome: &str) {
    RUNS.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn tracker_started() {
    ACTIVE_TRACKERS.inc();
}

#[cfg(feature = "metrics")]
pub fn tracker_stopped() {
    ACTIVE_TRACKERS.dec();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_retry_attempt() {}

#[cfg(not(feature = "metrics"))]
pub fn record_conflict() {}

#[cfg(not(feature = "metrics"))]
pub fn record_retries_exhausted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_barrier_timeout() {}

#[cfg(not(feature = "metrics"))]
pub fn record_confirmation_poll() {}

#[cfg(not(feature = "metrics"))]
pub fn record_dropped_handle() {}

#[cfg(not(feature = "metrics"))]
pub fn record_step_outcome(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_run_outcome(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn tracker_started() {}

#[cfg(not(feature = "metrics"))]
pub fn tracker_stopped() {}

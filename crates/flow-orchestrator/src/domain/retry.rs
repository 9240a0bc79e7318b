//! Retry policy and per-call retry bookkeeping.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded geometric backoff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of invocations allowed, including the first
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    /// Ceiling applied to every delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 2000,
            backoff_factor: 1.5,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Delay following `current`, rounded to whole milliseconds and capped.
    pub fn next_delay_ms(&self, current_ms: u64) -> u64 {
        let grown = (current_ms as f64 * self.backoff_factor).round();
        if !grown.is_finite() || grown >= self.max_delay_ms as f64 {
            self.max_delay_ms
        } else {
            // Factor >= 1 keeps the sequence non-decreasing
            (grown as u64).max(current_ms).min(self.max_delay_ms)
        }
    }

    /// The delays a call that never succeeds would sleep through.
    pub fn schedule(&self) -> Vec<u64> {
        let mut delays = Vec::new();
        let mut current = self.initial_delay_ms.min(self.max_delay_ms);
        for _ in 1..self.max_retries {
            delays.push(current);
            current = self.next_delay_ms(current);
        }
        delays
    }
}

/// State of one retried call. Not persisted.
#[derive(Clone, Debug)]
pub struct RetryContext {
    /// 0-based index of the invocation in flight
    pub attempt: u32,
    pub current_delay_ms: u64,
    pub max_retries: u32,
    pub last_error: Option<WorkflowError>,
    /// Delays actually slept, in order
    pub delays: Vec<Duration>,
}

impl RetryContext {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            current_delay_ms: policy.initial_delay_ms.min(policy.max_delay_ms),
            max_retries: policy.max_retries,
            last_error: None,
            delays: Vec::new(),
        }
    }

    pub fn attempts_remain(&self) -> bool {
        self.attempt + 1 < self.max_retries
    }

    /// Number of invocations made so far.
    pub fn invocations(&self) -> u32 {
        self.attempt + 1
    }

    /// Record the sleep about to happen and move to the next attempt.
    pub fn step(&mut self, policy: &RetryPolicy) -> Duration {
        let delay = Duration::from_millis(self.current_delay_ms);
        self.delays.push(delay);
        self.current_delay_ms = policy.next_delay_ms(self.current_delay_ms);
        self.attempt += 1;
        delay
    }
}

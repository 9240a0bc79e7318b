//! Running log exposed to observers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Aggregated outcome of a run.
///
/// `success` starts true and latches false on the first recorded error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    success: bool,
    messages: Vec<String>,
    errors: Vec<String>,
    /// Domain fields set by business actions (addresses, receipts, ...)
    payload: Map<String, Value>,
}

impl Default for AggregatedResult {
    fn default() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
            errors: Vec::new(),
            payload: Map::new(),
        }
    }
}

impl AggregatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Append an error; the run can no longer succeed.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.success = false;
    }

    pub fn set_payload(&mut self, key: impl Into<String>, value: Value) {
        self.payload.insert(key.into(), value);
    }
}

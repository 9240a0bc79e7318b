//! # Domain Layer
//!
//! Pure workflow logic with no I/O.

pub mod result;
pub mod retry;
pub mod state;
pub mod step;

pub use result::AggregatedResult;
pub use retry::{RetryContext, RetryPolicy};
pub use state::WorkflowState;
pub use step::{StepId, StepStatus, StepUpdate, WorkflowStep};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view of a run handed to observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub run_id: Uuid,
    pub state: WorkflowState,
    pub result: AggregatedResult,
}

impl WorkflowSnapshot {
    pub fn succeeded(&self) -> bool {
        self.result.success() && self.state.all_completed()
    }
}

//! Driving Ports (API - Inbound)

use crate::domain::{StepId, StepUpdate, WorkflowSnapshot};
use crate::error::WorkflowResult;
use uuid::Uuid;

/// Workflow state operations.
///
/// The runner is the single writer; observers only call `snapshot` and
/// `toggle_details`.
pub trait WorkflowApi: Send + Sync {
    /// Start a run with every step `pending` and the cursor at 0.
    ///
    /// Fails with `RunActive` while a previous run has not been reset.
    fn initialize(&self, titles: Vec<String>) -> WorkflowResult<Uuid>;

    /// Move the cursor to the position of `step_id`.
    fn advance(&self, step_id: StepId) -> WorkflowResult<usize>;

    /// Merge `update` into a step.
    fn update(&self, step_id: StepId, update: StepUpdate) -> WorkflowResult<()>;

    /// Discard the active run and cancel everything it started.
    fn reset(&self);

    /// Copy of the active run, if any.
    fn snapshot(&self) -> Option<WorkflowSnapshot>;

    /// Flip the display toggle; returns the new value.
    fn toggle_details(&self) -> WorkflowResult<bool>;
}

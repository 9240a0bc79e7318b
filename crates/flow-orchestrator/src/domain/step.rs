//! Workflow steps and their status machine.
//!
//! ```text
//! [PENDING] ──start──→ [IN_PROGRESS] ──ok───→ [COMPLETED]
//!                            │
//!                            └──error──→ [FAILED]
//! ```
//!
//! Terminal steps accept no further updates, including cosmetic ones.

use crate::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use shared_types::TxHandle;
use std::fmt;

/// Step identifier, unique within a workflow and assigned at declaration.
pub type StepId = u32;

/// Status of a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal status change.
    ///
    /// Staying in the same non-terminal status is allowed; it carries
    /// diagnostic-only updates.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Pending)
                | (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared unit of work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    id: StepId,
    title: String,
    status: StepStatus,
    /// Handle of the operation submitted by this step, if any
    pub tx_handle: Option<TxHandle>,
    /// Current confirmation depth of `tx_handle`
    pub confirmations: Option<u64>,
    /// Depth the step waits for
    pub required_confirmations: Option<u64>,
    /// Seconds until `required_confirmations` is expected to be reached
    pub estimated_time_left: Option<u64>,
    /// Set exactly when the step fails
    pub error: Option<String>,
    /// Summary set when the step completes
    pub complete_info: Option<String>,
}

impl WorkflowStep {
    pub fn new(id: StepId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: StepStatus::Pending,
            tx_handle: None,
            confirmations: None,
            required_confirmations: None,
            estimated_time_left: None,
            error: None,
            complete_info: None,
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge `update` into this step.
    ///
    /// Validation happens before any field is touched, so a rejected update
    /// leaves the step exactly as it was.
    pub fn apply(&mut self, update: StepUpdate) -> WorkflowResult<()> {
        if self.status.is_terminal() {
            return Err(WorkflowError::StepTerminal {
                step_id: self.id,
                status: self.status,
            });
        }

        let next = update.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidTransition {
                step_id: self.id,
                from: self.status,
                to: next,
            });
        }

        match next {
            StepStatus::Failed if update.error.is_none() => {
                return Err(self.invalid("failed status requires an error"));
            }
            StepStatus::Failed => {}
            _ if update.error.is_some() => {
                return Err(self.invalid("error may only be set when failing"));
            }
            _ => {}
        }
        if update.complete_info.is_some() && next != StepStatus::Completed {
            return Err(self.invalid("complete_info may only be set when completing"));
        }

        self.status = next;
        if let Some(handle) = update.tx_handle {
            self.tx_handle = Some(handle);
        }
        if let Some(confirmations) = update.confirmations {
            self.confirmations = Some(confirmations);
        }
        if let Some(required) = update.required_confirmations {
            self.required_confirmations = Some(required);
        }
        if let Some(eta) = update.estimated_time_left {
            self.estimated_time_left = Some(eta);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(info) = update.complete_info {
            self.complete_info = Some(info);
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> WorkflowError {
        WorkflowError::InvalidUpdate {
            step_id: self.id,
            reason: reason.to_string(),
        }
    }
}

/// Partial set of step fields. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepUpdate {
    pub status: Option<StepStatus>,
    pub tx_handle: Option<TxHandle>,
    pub confirmations: Option<u64>,
    pub required_confirmations: Option<u64>,
    pub estimated_time_left: Option<u64>,
    pub error: Option<String>,
    pub complete_info: Option<String>,
}

impl StepUpdate {
    pub fn in_progress() -> Self {
        Self {
            status: Some(StepStatus::InProgress),
            ..Self::default()
        }
    }

    pub fn completed(info: Option<String>) -> Self {
        Self {
            status: Some(StepStatus::Completed),
            complete_info: info,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(StepStatus::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Diagnostic update carrying a submitted handle.
    pub fn tx_handle(handle: TxHandle) -> Self {
        Self {
            tx_handle: Some(handle),
            ..Self::default()
        }
    }

    /// Diagnostic update from a confirmation poll tick.
    pub fn confirmations(confirmations: u64, required: u64, estimated_time_left: u64) -> Self {
        Self {
            confirmations: Some(confirmations),
            required_confirmations: Some(required),
            estimated_time_left: Some(estimated_time_left),
            ..Self::default()
        }
    }
}

//! Error types for the workflow orchestrator

use crate::domain::step::{StepId, StepStatus};
use shared_types::{LedgerError, LedgerErrorKind, TxHandle};
use thiserror::Error;

/// How a failure should be treated by the retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Stale ordering input; re-running the action with fresh inputs may succeed.
    Conflict,
    /// Anything else; surfaced immediately.
    Fatal,
}

/// Orchestrator errors
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// The ordering counter used for a submission was stale
    #[error("Ordering conflict: {detail}")]
    Conflict { detail: String },

    /// Conflicts persisted past the retry budget
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<WorkflowError>,
    },

    /// A precondition goal still did not hold after acting on it
    #[error("Precondition not achieved: {goal}")]
    PreconditionFailed { goal: String },

    /// The ledger refused the call outright
    #[error("{reason}")]
    SubmissionRejected { reason: String },

    /// A tracked handle disappeared before reaching the required depth
    #[error("Transaction {handle} was dropped or replaced before confirmation")]
    TrackingInconclusive { handle: TxHandle },

    /// The ledger could not be reached
    #[error("Ledger unavailable: {detail}")]
    LedgerUnavailable { detail: String },

    /// No step with this id in the active run
    #[error("Step {step_id} not found")]
    StepNotFound { step_id: StepId },

    /// The step already reached a terminal status
    #[error("Step {step_id} is already {status}")]
    StepTerminal { step_id: StepId, status: StepStatus },

    /// Status change that does not follow pending -> in_progress -> terminal
    #[error("Invalid transition for step {step_id}: {from} -> {to}")]
    InvalidTransition {
        step_id: StepId,
        from: StepStatus,
        to: StepStatus,
    },

    /// Field update inconsistent with the resulting status
    #[error("Invalid update for step {step_id}: {reason}")]
    InvalidUpdate { step_id: StepId, reason: String },

    /// The cursor may not move backwards
    #[error("Cannot move cursor back from {from} to {to}")]
    InvalidAdvance { from: usize, to: usize },

    /// A run is already initialized; reset it first
    #[error("A workflow run is already active")]
    RunActive,

    /// No run is initialized, or the run was reset underneath the caller
    #[error("No active workflow run")]
    NoActiveRun,

    /// The run was cancelled
    #[error("Workflow run cancelled")]
    Cancelled,

    /// Workflow declared without steps
    #[error("Workflow has no steps")]
    EmptyWorkflow,
}

impl WorkflowError {
    /// Default classification: only ordering conflicts are retryable.
    pub fn class(&self) -> ErrorClass {
        match self {
            WorkflowError::Conflict { .. } => ErrorClass::Conflict,
            _ => ErrorClass::Fatal,
        }
    }

    /// Label used in metrics and logs.
    pub fn kind_label(&self) -> &'static str {
        match self {
            WorkflowError::Conflict { .. } => "conflict",
            WorkflowError::RetriesExhausted { .. } => "retries_exhausted",
            WorkflowError::PreconditionFailed { .. } => "precondition_failed",
            WorkflowError::SubmissionRejected { .. } => "submission_rejected",
            WorkflowError::TrackingInconclusive { .. } => "tracking_inconclusive",
            WorkflowError::LedgerUnavailable { .. } => "ledger_unavailable",
            WorkflowError::StepNotFound { .. }
            | WorkflowError::StepTerminal { .. }
            | WorkflowError::InvalidTransition { .. }
            | WorkflowError::InvalidUpdate { .. }
            | WorkflowError::InvalidAdvance { .. }
            | WorkflowError::RunActive
            | WorkflowError::NoActiveRun
            | WorkflowError::EmptyWorkflow => "state",
            WorkflowError::Cancelled => "cancelled",
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(err: LedgerError) -> Self {
        match err.kind {
            LedgerErrorKind::Conflict => WorkflowError::Conflict { detail: err.detail },
            LedgerErrorKind::Rejected => WorkflowError::SubmissionRejected { reason: err.detail },
            LedgerErrorKind::Network => WorkflowError::LedgerUnavailable { detail: err.detail },
        }
    }
}

/// Result type for orchestrator operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Default `classify` function for the retry controller.
pub fn classify(err: &WorkflowError) -> ErrorClass {
    err.class()
}

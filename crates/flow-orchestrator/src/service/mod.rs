//! # Service Layer
//!
//! The orchestrator components, leaves first:
//!
//! - `submitter`: one mutating call, typed failure
//! - `retry`: bounded backoff around conflict-prone actions
//! - `barrier`: wait for outstanding operations to settle
//! - `tracker`: cancellable confirmation polling
//! - `guard`: check-act-verify for idempotent setup
//! - `runner` / `context`: step sequencing and the per-step handle

pub mod barrier;
pub mod context;
pub mod guard;
pub mod retry;
pub mod runner;
pub mod submitter;
pub mod tracker;

pub use barrier::{BarrierOutcome, PendingBarrier};
pub use context::StepContext;
pub use guard::{GuardOutcome, PreconditionGuard};
pub use retry::RetryController;
pub use runner::{FnAction, StepAction, StepOutcome, WorkflowRunner, WorkflowStepDef};
pub use submitter::TransactionSubmitter;
pub use tracker::{ConfirmationTracker, ConfirmationUpdate, TrackingHandle, TrackingOutcome};

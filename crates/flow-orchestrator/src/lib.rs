//! # flow-orchestrator
//!
//! Drives multi-step ledger workflows to completion: submits mutating
//! calls, recovers from nonce races with bounded backoff, tracks
//! confirmation depth and keeps an observable step state machine.
//!
//! ## Architecture
//!
//! ```text
//! business step ──→ StepContext ──┬── PreconditionGuard (check → act → verify)
//!                                 ├── PendingBarrier ──→ RetryController ──→ TransactionSubmitter
//!                                 └── ConfirmationTracker (child token of the run)
//!                                               │
//! WorkflowRunner ──owns──→ WorkflowState ──snapshot──→ InMemoryEventBus ──→ observers
//! ```
//!
//! ## Step State Machine
//!
//! ```text
//! [PENDING] ──→ [IN_PROGRESS] ──┬──→ [COMPLETED]
//!                               └──→ [FAILED]
//! ```
//!
//! The first failed step halts the run; later steps stay `pending` and the
//! run's `success` flag stays false.
//!
//! ## Example
//!
//! ```rust,ignore
//! use flow_orchestrator::{OrchestratorConfig, StepOutcome, WorkflowRunner, WorkflowStepDef};
//!
//! let runner = WorkflowRunner::new(OrchestratorConfig::default(), ledger)?;
//! let snapshot = runner
//!     .run(vec![WorkflowStepDef::from_fn("Mint", |ctx| async move {
//!         ctx.submit_and_confirm(&account, &call, Some(12)).await?;
//!         Ok(StepOutcome::with_info("minted"))
//!     })])
//!     .await?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::SimulatedLedger;
pub use config::{BarrierConfig, ConfigError, OrchestratorConfig, PacingConfig, TrackerConfig};
pub use domain::{
    AggregatedResult, RetryContext, RetryPolicy, StepId, StepStatus, StepUpdate, WorkflowSnapshot,
    WorkflowState, WorkflowStep,
};
pub use error::{classify, ErrorClass, WorkflowError, WorkflowResult};
pub use events::{WorkflowEvent, WorkflowTopic};
pub use ports::{LedgerClient, WorkflowApi};
pub use service::{
    BarrierOutcome, ConfirmationTracker, ConfirmationUpdate, FnAction, GuardOutcome,
    PendingBarrier, PreconditionGuard, RetryController, StepAction, StepContext, StepOutcome,
    TrackingHandle, TrackingOutcome, TransactionSubmitter, WorkflowRunner, WorkflowStepDef,
};

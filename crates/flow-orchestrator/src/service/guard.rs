//! Idempotent setup: check, act only if needed, verify.

use crate::error::{WorkflowError, WorkflowResult};
use std::future::Future;
use tracing::{debug, info, warn};

/// What `ensure` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The goal already held; no mutating call was made
    AlreadySatisfied,
    /// The action ran and the goal holds now
    Achieved,
}

/// Check-act-verify wrapper used for every idempotent setup action
/// (registration, module binding, topic membership, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct PreconditionGuard;

impl PreconditionGuard {
    pub fn new() -> Self {
        Self
    }

    /// Make `goal` hold.
    ///
    /// `act` runs at most once and only when `check_goal` reports false.
    /// A goal still unmet after acting is `PreconditionFailed`, which is
    /// always fatal. Errors from any of the three closures pass through.
    pub async fn ensure<C, CF, A, AF, V, VF>(
        &self,
        goal: &str,
        check_goal: C,
        act: A,
        verify_after: V,
    ) -> WorkflowResult<GuardOutcome>
    where
        C: FnOnce() -> CF,
        CF: Future<Output = WorkflowResult<bool>>,
        A: FnOnce() -> AF,
        AF: Future<Output = WorkflowResult<()>>,
        V: FnOnce() -> VF,
        VF: Future<Output = WorkflowResult<bool>>,
    {
        if check_goal().await? {
            debug!(goal, "Precondition already satisfied");
            return Ok(GuardOutcome::AlreadySatisfied);
        }

        info!(goal, "Precondition unmet, acting");
        act().await?;

        if verify_after().await? {
            info!(goal, "Precondition achieved");
            Ok(GuardOutcome::Achieved)
        } else {
            warn!(goal, "Precondition still unmet after acting");
            Err(WorkflowError::PreconditionFailed {
                goal: goal.to_string(),
            })
        }
    }
}

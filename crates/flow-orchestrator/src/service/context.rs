//! Per-step handle given to business actions.

use super::{
    BarrierOutcome, ConfirmationTracker, GuardOutcome, PendingBarrier, PreconditionGuard,
    RetryController, TrackingHandle, TrackingOutcome, TransactionSubmitter, WorkflowRunner,
};
use crate::config::OrchestratorConfig;
use crate::domain::{RetryPolicy, StepId, StepUpdate};
use crate::error::{classify, ErrorClass, WorkflowError, WorkflowResult};
use crate::ports::LedgerClient;
use shared_types::{AccountId, LedgerCall, TxHandle};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// What a step action can do to its run.
///
/// Status changes stay with the runner; the context only adds messages,
/// payload and diagnostics to its own step. Every tracker started here is
/// a child of the run's token and stops when the run is reset.
#[derive(Clone)]
pub struct StepContext {
    runner: WorkflowRunner,
    run_id: Uuid,
    step_id: StepId,
    cancel: CancellationToken,
}

impl StepContext {
    pub(crate) fn new(
        runner: WorkflowRunner,
        run_id: Uuid,
        step_id: StepId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runner,
            run_id,
            step_id,
            cancel,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &OrchestratorConfig {
        self.runner.config()
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        self.runner.ledger()
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.runner.inner.submitter
    }

    pub fn retry_controller(&self) -> &RetryController {
        &self.runner.inner.retry
    }

    pub fn barrier(&self) -> &PendingBarrier {
        &self.runner.inner.barrier
    }

    pub fn tracker(&self) -> &ConfirmationTracker {
        &self.runner.inner.tracker
    }

    pub fn guard(&self) -> &PreconditionGuard {
        &self.runner.inner.guard
    }

    pub fn message(&self, text: impl Into<String>) -> WorkflowResult<()> {
        self.runner.message_in(Some(self.run_id), text.into())
    }

    pub fn set_payload(&self, key: impl Into<String>, value: serde_json::Value) -> WorkflowResult<()> {
        self.runner.payload_in(Some(self.run_id), key.into(), value)
    }

    /// Attach a submitted handle to this step.
    pub fn record_handle(&self, handle: TxHandle) -> WorkflowResult<()> {
        self.runner
            .update_in(Some(self.run_id), self.step_id, StepUpdate::tx_handle(handle))
    }

    /// Barrier wait with the configured interval and cap. A timeout is
    /// recorded as a message and the step carries on.
    pub async fn await_quiescence(&self, account: &AccountId) -> WorkflowResult<BarrierOutcome> {
        let config = &self.config().barrier;
        let outcome = self
            .barrier()
            .await_quiescence(account, config.poll_interval(), config.max_wait(), &self.cancel)
            .await;

        match outcome {
            BarrierOutcome::Cancelled => return Err(WorkflowError::Cancelled),
            BarrierOutcome::TimedOut {
                outstanding,
                confirmed,
            } => {
                self.message(format!(
                    "Timed out after {} ms waiting for pending operations of {} (outstanding {}, confirmed {}), proceeding",
                    config.max_wait_ms,
                    account,
                    display_count(outstanding),
                    display_count(confirmed),
                ))?;
            }
            BarrierOutcome::Quiescent { .. } => {}
        }
        Ok(outcome)
    }

    /// Retry `action` with the configured policy and a custom classifier.
    pub async fn retry<T, F, Fut, C>(&self, action: F, classify: C) -> WorkflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
        C: Fn(&WorkflowError) -> ErrorClass,
    {
        self.retry_controller().retry(action, classify).await
    }

    /// Retry `action` under `policy` for this call only.
    pub async fn retry_with<T, F, Fut, C>(
        &self,
        policy: &RetryPolicy,
        action: F,
        classify: C,
    ) -> WorkflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
        C: Fn(&WorkflowError) -> ErrorClass,
    {
        self.retry_controller()
            .retry_with(policy, action, classify)
            .await
    }

    /// Wait for the account to settle, then submit with a fresh nonce on
    /// every attempt until the ledger accepts or a fatal error occurs.
    pub async fn submit_with_retry(
        &self,
        account: &AccountId,
        call: &LedgerCall,
    ) -> WorkflowResult<TxHandle> {
        self.await_quiescence(account).await?;

        let submitter = self.submitter();
        let handle = self
            .retry(|| submitter.submit_fresh(account, call), classify)
            .await?;

        self.record_handle(handle)?;
        self.message(format!("Submitted {} as {}", call, handle.short()))?;
        Ok(handle)
    }

    /// Start a tracker whose ticks update this step's diagnostics.
    pub fn track(&self, handle: TxHandle, required: u64) -> TrackingHandle {
        let runner = self.runner.clone();
        let run_id = self.run_id;
        let step_id = self.step_id;

        self.tracker().track_with_parent(
            handle,
            required,
            move |update| {
                let diagnostics = StepUpdate::confirmations(
                    update.confirmations,
                    update.required,
                    update.estimated_time_left_secs,
                );
                if let Err(e) = runner.update_in(Some(run_id), step_id, diagnostics) {
                    debug!(step_id, error = %e, "Dropping confirmation update");
                }
            },
            &self.cancel,
        )
    }

    /// Track `handle` to `required` confirmations and interpret the outcome.
    ///
    /// A dropped handle is `TrackingInconclusive`. An exhausted poll budget
    /// is only noted; the step proceeds.
    pub async fn await_confirmations(&self, handle: TxHandle, required: u64) -> WorkflowResult<u64> {
        match self.track(handle, required).wait().await {
            TrackingOutcome::Confirmed { confirmations } => {
                self.message(format!(
                    "{} confirmed with {} confirmations",
                    handle.short(),
                    confirmations
                ))?;
                Ok(confirmations)
            }
            TrackingOutcome::Dropped => Err(WorkflowError::TrackingInconclusive { handle }),
            TrackingOutcome::BudgetExhausted { confirmations } => {
                self.message(format!(
                    "Stopped polling {} at {}/{} confirmations, proceeding",
                    handle.short(),
                    confirmations,
                    required
                ))?;
                Ok(confirmations)
            }
            TrackingOutcome::Cancelled { .. } => Err(WorkflowError::Cancelled),
        }
    }

    /// Barrier, retried fresh submission, then confirmation tracking.
    ///
    /// `required = None` uses the configured default depth.
    pub async fn submit_and_confirm(
        &self,
        account: &AccountId,
        call: &LedgerCall,
        required: Option<u64>,
    ) -> WorkflowResult<TxHandle> {
        let required =
            required.unwrap_or(self.config().tracker.default_required_confirmations);
        let handle = self.submit_with_retry(account, call).await?;
        self.await_confirmations(handle, required).await?;
        Ok(handle)
    }

    /// Check-act-verify for an idempotent setup goal.
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
        let outcome = self
            .guard()
            .ensure(goal, check_goal, act, verify_after)
            .await?;
        if outcome == GuardOutcome::AlreadySatisfied {
            self.message(format!("{goal}: already satisfied, skipping"))?;
        }
        Ok(outcome)
    }
}

fn display_count(count: Option<u64>) -> String {
    count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

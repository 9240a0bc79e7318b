//! # Workflow Runner
//!
//! Sequences declared steps, owns the single `WorkflowState` of the active
//! run and publishes a snapshot after every mutation.
//!
//! ```text
//! initialize ──→ for each step:
//!                  pace ──→ advance ──→ in_progress ──→ action ──┬─ ok ──→ completed
//!                                                                └─ err ─→ failed, halt
//!            ──→ RunFinished
//! ```
//!
//! Every mutation names the run it belongs to. After a `reset`, stragglers
//! from the discarded run get `NoActiveRun` instead of touching the next one.

use super::{
    ConfirmationTracker, PendingBarrier, PreconditionGuard, RetryController, StepContext,
    TransactionSubmitter,
};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::domain::{
    AggregatedResult, StepId, StepStatus, StepUpdate, WorkflowSnapshot, WorkflowState,
};
use crate::error::{WorkflowError, WorkflowResult};
use crate::events::{WorkflowEvent, WorkflowTopic};
use crate::metrics;
use crate::ports::{LedgerClient, WorkflowApi};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{EventFilter, EventPublisher, EventStream, InMemoryEventBus, Subscription};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

// =============================================================================
// STEP ACTIONS
// =============================================================================

/// What a successful step reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub complete_info: Option<String>,
}

impl StepOutcome {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn with_info(info: impl Into<String>) -> Self {
        Self {
            complete_info: Some(info.into()),
        }
    }
}

/// Business logic of one step.
///
/// Errors returned here are final for the step: retrying belongs inside
/// the action (see [`StepContext::submit_with_retry`]).
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn execute(&self, ctx: &StepContext) -> WorkflowResult<StepOutcome>;
}

/// Adapter turning an async closure into a [`StepAction`].
pub struct FnAction<F>(pub F);

#[async_trait]
impl<F, Fut> StepAction for FnAction<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = WorkflowResult<StepOutcome>> + Send,
{
    async fn execute(&self, ctx: &StepContext) -> WorkflowResult<StepOutcome> {
        (self.0)(ctx.clone()).await
    }
}

/// A step as declared by a business workflow.
#[derive(Clone)]
pub struct WorkflowStepDef {
    pub title: String,
    pub action: Arc<dyn StepAction>,
}

impl WorkflowStepDef {
    pub fn new(title: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self {
            title: title.into(),
            action: Arc::new(action),
        }
    }

    pub fn from_fn<F, Fut>(title: impl Into<String>, f: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkflowResult<StepOutcome>> + Send + 'static,
    {
        Self::new(title, FnAction(f))
    }
}

// =============================================================================
// RUNNER
// =============================================================================

struct RunState {
    run_id: Uuid,
    state: WorkflowState,
    result: AggregatedResult,
    cancel: CancellationToken,
}

impl RunState {
    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            run_id: self.run_id,
            state: self.state.clone(),
            result: self.result.clone(),
        }
    }
}

pub(crate) struct RunnerShared {
    run: RwLock<Option<RunState>>,
    bus: Arc<InMemoryEventBus<WorkflowEvent>>,
    ledger: Arc<dyn LedgerClient>,
    config: OrchestratorConfig,
    pub(crate) submitter: TransactionSubmitter,
    pub(crate) retry: RetryController,
    pub(crate) barrier: PendingBarrier,
    pub(crate) tracker: ConfirmationTracker,
    pub(crate) guard: PreconditionGuard,
}

/// Drives workflows against one ledger. Cheap to clone.
#[derive(Clone)]
pub struct WorkflowRunner {
    pub(crate) inner: Arc<RunnerShared>,
}

impl WorkflowRunner {
    pub fn new(
        config: OrchestratorConfig,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, ConfigError> {
        Self::with_bus(config, ledger, Arc::new(InMemoryEventBus::new()))
    }

    /// Build a runner publishing on an existing bus.
    pub fn with_bus(
        config: OrchestratorConfig,
        ledger: Arc<dyn LedgerClient>,
        bus: Arc<InMemoryEventBus<WorkflowEvent>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let inner = RunnerShared {
            run: RwLock::new(None),
            bus,
            submitter: TransactionSubmitter::new(ledger.clone()),
            retry: RetryController::new(config.retry.clone()),
            barrier: PendingBarrier::new(ledger.clone()),
            tracker: ConfirmationTracker::new(ledger.clone(), config.tracker.clone()),
            guard: PreconditionGuard::new(),
            ledger,
            config,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.inner.ledger
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus<WorkflowEvent>> {
        &self.inner.bus
    }

    pub fn subscribe(&self, topics: Vec<WorkflowTopic>) -> Subscription<WorkflowEvent> {
        self.inner.bus.subscribe(EventFilter::topics(topics))
    }

    /// Like [`subscribe`](Self::subscribe), as a `Stream`.
    pub fn event_stream(&self, topics: Vec<WorkflowTopic>) -> EventStream<WorkflowEvent> {
        self.inner.bus.event_stream(EventFilter::topics(topics))
    }

    /// Append a progress message to the active run.
    pub fn push_message(&self, text: impl Into<String>) -> WorkflowResult<()> {
        self.message_in(None, text.into())
    }

    /// Set a domain payload field on the active run.
    pub fn set_payload(&self, key: impl Into<String>, value: serde_json::Value) -> WorkflowResult<()> {
        self.payload_in(None, key.into(), value)
    }

    // -------------------------------------------------------------------------
    // Run-scoped mutation
    // -------------------------------------------------------------------------

    /// Apply `f` to the run, then publish the event built from the fresh
    /// snapshot. `run_id = None` targets whatever run is active.
    fn mutate<T, F, E>(&self, run_id: Option<Uuid>, f: F, event: E) -> WorkflowResult<T>
    where
        F: FnOnce(&mut RunState) -> WorkflowResult<T>,
        E: FnOnce(Uuid, &T, Arc<WorkflowSnapshot>) -> Option<WorkflowEvent>,
    {
        let mut guard = self.inner.run.write();
        let run = match guard.as_mut() {
            Some(run) if run_id.map_or(true, |id| id == run.run_id) => run,
            _ => return Err(WorkflowError::NoActiveRun),
        };
        let value = f(run)?;
        if let Some(ev) = event(run.run_id, &value, Arc::new(run.snapshot())) {
            self.inner.bus.publish(ev);
        }
        Ok(value)
    }

    pub(crate) fn advance_in(&self, run_id: Option<Uuid>, step_id: StepId) -> WorkflowResult<usize> {
        self.mutate(
            run_id,
            |run| run.state.advance(step_id),
            |run_id, position, snapshot| {
                Some(WorkflowEvent::CursorAdvanced {
                    run_id,
                    position: *position,
                    snapshot,
                })
            },
        )
    }

    pub(crate) fn update_in(
        &self,
        run_id: Option<Uuid>,
        step_id: StepId,
        update: StepUpdate,
    ) -> WorkflowResult<()> {
        let status = self.mutate(
            run_id,
            |run| {
                let step = run.state.update(step_id, update)?;
                let status = step.status();
                if status == StepStatus::Failed {
                    let text = format!(
                        "{}: {}",
                        step.title(),
                        step.error.as_deref().unwrap_or("failed")
                    );
                    error!(step_id, error = %text, "Step failed");
                    run.result.record_error(text);
                }
                Ok(status)
            },
            |run_id, status, snapshot| {
                Some(WorkflowEvent::StepUpdated {
                    run_id,
                    step_id,
                    status: *status,
                    snapshot,
                })
            },
        )?;
        if status.is_terminal() {
            metrics::record_step_outcome(status.as_str());
        }
        Ok(())
    }

    pub(crate) fn message_in(&self, run_id: Option<Uuid>, text: String) -> WorkflowResult<()> {
        info!(message = %text, "Workflow message");
        let published = text.clone();
        self.mutate(
            run_id,
            |run| {
                run.result.push_message(text);
                Ok(())
            },
            |run_id, _, snapshot| {
                Some(WorkflowEvent::Message {
                    run_id,
                    text: published,
                    snapshot,
                })
            },
        )
    }

    pub(crate) fn payload_in(
        &self,
        run_id: Option<Uuid>,
        key: String,
        value: serde_json::Value,
    ) -> WorkflowResult<()> {
        self.mutate(
            run_id,
            |run| {
                run.result.set_payload(key, value);
                Ok(())
            },
            |_, _, _| None,
        )
    }

    fn run_token(&self, run_id: Uuid) -> WorkflowResult<CancellationToken> {
        match self.inner.run.read().as_ref() {
            Some(run) if run.run_id == run_id => Ok(run.cancel.clone()),
            _ => Err(WorkflowError::NoActiveRun),
        }
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Initialize a run from `steps` and execute them in order.
    ///
    /// Returns the final snapshot whether or not every step completed; a
    /// failed step halts the run and leaves later steps `pending`. Errors
    /// are reserved for runs that could not start or were reset midway.
    /// The run stays in place for observers until `reset` is called.
    pub async fn run(&self, steps: Vec<WorkflowStepDef>) -> WorkflowResult<WorkflowSnapshot> {
        let titles = steps.iter().map(|s| s.title.clone()).collect();
        let run_id = self.initialize(titles)?;
        let cancel = self.run_token(run_id)?;
        let span = info_span!("workflow_run", %run_id, steps = steps.len());

        async {
            for (idx, def) in steps.iter().enumerate() {
                let step_id = idx as StepId + 1;

                if idx > 0 {
                    if let Some(delay) = self.inner.config.pacing.inter_step_delay() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }

                if !self.run_step(run_id, step_id, def, &cancel).await? {
                    break;
                }
            }

            self.finish(run_id)
        }
        .instrument(span)
        .await
    }

    /// Execute one step. `Ok(false)` means the step failed and the run halts.
    async fn run_step(
        &self,
        run_id: Uuid,
        step_id: StepId,
        def: &WorkflowStepDef,
        cancel: &CancellationToken,
    ) -> WorkflowResult<bool> {
        let span = info_span!("step", step_id, title = %def.title);
        async {
            self.advance_in(Some(run_id), step_id)?;
            self.update_in(Some(run_id), step_id, StepUpdate::in_progress())?;
            info!("Step started");

            let ctx = StepContext::new(self.clone(), run_id, step_id, cancel.clone());
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
                outcome = def.action.execute(&ctx) => outcome,
            };

            match outcome {
                Ok(outcome) => {
                    self.update_in(Some(run_id), step_id, StepUpdate::completed(outcome.complete_info))?;
                    info!("Step completed");
                    Ok(true)
                }
                Err(_) if cancel.is_cancelled() => Err(WorkflowError::Cancelled),
                Err(e) => {
                    warn!(error = %e, kind = e.kind_label(), "Step action failed");
                    self.update_in(Some(run_id), step_id, StepUpdate::failed(e.to_string()))?;
                    Ok(false)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn finish(&self, run_id: Uuid) -> WorkflowResult<WorkflowSnapshot> {
        let snapshot = self.mutate(
            Some(run_id),
            |run| Ok(run.snapshot()),
            |run_id, finished, snapshot| {
                Some(WorkflowEvent::RunFinished {
                    run_id,
                    success: finished.succeeded(),
                    snapshot,
                })
            },
        )?;

        let success = snapshot.succeeded();
        metrics::record_run_outcome(if success { "success" } else { "failure" });
        info!(
            success,
            current_step = snapshot.state.current_step(),
            errors = snapshot.result.errors().len(),
            failed_step = ?snapshot.state.first_failed().map(|s| s.title()),
            "Workflow finished"
        );
        Ok(snapshot)
    }
}

impl WorkflowApi for WorkflowRunner {
    fn initialize(&self, titles: Vec<String>) -> WorkflowResult<Uuid> {
        let mut guard = self.inner.run.write();
        if guard.is_some() {
            return Err(WorkflowError::RunActive);
        }

        let run = RunState {
            run_id: Uuid::new_v4(),
            state: WorkflowState::from_titles(titles)?,
            result: AggregatedResult::new(),
            cancel: CancellationToken::new(),
        };
        let run_id = run.run_id;
        info!(%run_id, steps = run.state.total_steps(), "Workflow initialized");
        self.inner.bus.publish(WorkflowEvent::RunInitialized {
            run_id,
            snapshot: Arc::new(run.snapshot()),
        });
        *guard = Some(run);
        Ok(run_id)
    }

    fn advance(&self, step_id: StepId) -> WorkflowResult<usize> {
        self.advance_in(None, step_id)
    }

    fn update(&self, step_id: StepId, update: StepUpdate) -> WorkflowResult<()> {
        self.update_in(None, step_id, update)
    }

    fn reset(&self) {
        let Some(run) = self.inner.run.write().take() else {
            debug!("Reset with no active run");
            return;
        };
        run.cancel.cancel();
        info!(run_id = %run.run_id, "Workflow reset");
        self.inner.bus.publish(WorkflowEvent::RunReset {
            run_id: run.run_id,
            snapshot: Arc::new(run.snapshot()),
        });
    }

    fn snapshot(&self) -> Option<WorkflowSnapshot> {
        self.inner.run.read().as_ref().map(RunState::snapshot)
    }

    fn toggle_details(&self) -> WorkflowResult<bool> {
        self.mutate(None, |run| Ok(run.state.toggle_details()), |_, _, _| None)
    }
}

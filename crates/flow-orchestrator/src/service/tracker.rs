//! Confirmation tracking for submitted handles.
//!
//! Each tracked handle gets its own task, interval and cancellation token;
//! trackers share nothing but the ledger client.

use crate::config::TrackerConfig;
use crate::metrics;
use crate::ports::LedgerClient;
use shared_types::{LedgerError, TxHandle};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress reported on every successful poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationUpdate {
    pub handle: TxHandle,
    pub confirmations: u64,
    pub required: u64,
    /// `max(0, required - confirmations) * seconds_per_block`
    pub estimated_time_left_secs: u64,
}

/// How tracking ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingOutcome {
    /// Required depth reached
    Confirmed { confirmations: u64 },
    /// The ledger stopped recognising the handle. Inconclusive, not success.
    Dropped,
    /// Poll budget used up before the required depth
    BudgetExhausted { confirmations: u64 },
    Cancelled { confirmations: u64 },
}

/// Owner of a running tracker. Dropping it stops the poll.
#[derive(Debug)]
pub struct TrackingHandle {
    token: CancellationToken,
    task: Option<JoinHandle<TrackingOutcome>>,
}

impl TrackingHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the tracker to stop.
    pub async fn wait(mut self) -> TrackingOutcome {
        let Some(task) = self.task.take() else {
            return TrackingOutcome::Cancelled { confirmations: 0 };
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Tracker task ended abnormally");
                TrackingOutcome::Cancelled { confirmations: 0 }
            }
        }
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Polls a handle until it reaches the required confirmation depth.
#[derive(Clone)]
pub struct ConfirmationTracker {
    ledger: Arc<dyn LedgerClient>,
    config: TrackerConfig,
}

impl ConfirmationTracker {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: TrackerConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Start tracking on its own token.
    pub fn track<F>(&self, handle: TxHandle, required: u64, on_update: F) -> TrackingHandle
    where
        F: FnMut(ConfirmationUpdate) + Send + 'static,
    {
        self.spawn(handle, required, on_update, CancellationToken::new())
    }

    /// Start tracking on a child of `parent`, so cancelling the parent
    /// stops this tracker too.
    pub fn track_with_parent<F>(
        &self,
        handle: TxHandle,
        required: u64,
        on_update: F,
        parent: &CancellationToken,
    ) -> TrackingHandle
    where
        F: FnMut(ConfirmationUpdate) + Send + 'static,
    {
        self.spawn(handle, required, on_update, parent.child_token())
    }

    fn spawn<F>(
        &self,
        handle: TxHandle,
        required: u64,
        on_update: F,
        token: CancellationToken,
    ) -> TrackingHandle
    where
        F: FnMut(ConfirmationUpdate) + Send + 'static,
    {
        let ledger = self.ledger.clone();
        let config = self.config.clone();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            metrics::tracker_started();
            let outcome = poll_loop(ledger, config, handle, required, on_update, task_token).await;
            metrics::tracker_stopped();
            outcome
        });

        TrackingHandle {
            token,
            task: Some(task),
        }
    }
}

async fn poll_loop<F>(
    ledger: Arc<dyn LedgerClient>,
    config: TrackerConfig,
    handle: TxHandle,
    required: u64,
    mut on_update: F,
    token: CancellationToken,
) -> TrackingOutcome
where
    F: FnMut(ConfirmationUpdate),
{
    let mut interval = tokio::time::interval(config.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u32;
    let mut confirmations = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(tx_handle = %handle.short(), confirmations, "Tracking cancelled");
                return TrackingOutcome::Cancelled { confirmations };
            }
            _ = interval.tick() => {}
        }

        ticks += 1;
        metrics::record_confirmation_poll();

        match poll_once(ledger.as_ref(), &handle).await {
            Ok(None) => {
                warn!(tx_handle = %handle.short(), ticks, "Tracked transaction dropped or replaced");
                metrics::record_dropped_handle();
                return TrackingOutcome::Dropped;
            }
            Ok(Some(depth)) => {
                // A lagging head never moves the reported depth backwards
                confirmations = confirmations.max(depth);
                let estimated_time_left_secs = required
                    .saturating_sub(confirmations)
                    .saturating_mul(config.seconds_per_block);
                debug!(
                    tx_handle = %handle.short(),
                    confirmations,
                    required,
                    estimated_time_left_secs,
                    "Confirmation poll"
                );
                on_update(ConfirmationUpdate {
                    handle,
                    confirmations,
                    required,
                    estimated_time_left_secs,
                });
                if confirmations >= required {
                    info!(tx_handle = %handle.short(), confirmations, ticks, "Transaction confirmed");
                    return TrackingOutcome::Confirmed { confirmations };
                }
            }
            Err(e) => {
                warn!(tx_handle = %handle.short(), error = %e, "Confirmation poll failed");
            }
        }

        if ticks >= config.max_ticks {
            warn!(tx_handle = %handle.short(), confirmations, required, "Confirmation poll budget exhausted");
            return TrackingOutcome::BudgetExhausted { confirmations };
        }
    }
}

/// Depth of `handle` right now, or `None` if the ledger lost it.
async fn poll_once(
    ledger: &dyn LedgerClient,
    handle: &TxHandle,
) -> Result<Option<u64>, LedgerError> {
    let height = ledger.current_height().await?;
    Ok(ledger
        .lookup(handle)
        .await?
        .map(|lookup| lookup.confirmations_at(height)))
}

//! Wait for an account's outstanding operations to settle.

use crate::metrics;
use crate::ports::LedgerClient;
use shared_types::AccountId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a barrier wait ended. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Outstanding and confirmed counts matched on poll number `polls`
    Quiescent { polls: u32 },
    /// `max_wait` elapsed first; the last counts seen are attached
    TimedOut {
        outstanding: Option<u64>,
        confirmed: Option<u64>,
    },
    Cancelled,
}

impl BarrierOutcome {
    pub fn is_quiescent(&self) -> bool {
        matches!(self, BarrierOutcome::Quiescent { .. })
    }
}

/// Polls outstanding vs confirmed counts until they agree.
///
/// Lowers the odds that the next ordering-sensitive submission races one
/// still in flight. It is best effort: a timeout lets the caller proceed.
#[derive(Clone)]
pub struct PendingBarrier {
    ledger: Arc<dyn LedgerClient>,
}

impl PendingBarrier {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    pub async fn await_quiescence(
        &self,
        account: &AccountId,
        poll_interval: Duration,
        max_wait: Duration,
        cancel: &CancellationToken,
    ) -> BarrierOutcome {
        let deadline = Instant::now() + max_wait;
        let mut polls = 0u32;
        let mut last = (None, None);

        loop {
            polls += 1;
            match self.read_counts(account).await {
                Ok((outstanding, confirmed)) => {
                    debug!(account = %account, outstanding, confirmed, poll = polls, "Barrier poll");
                    if outstanding == confirmed {
                        if polls > 1 {
                            info!(account = %account, polls, "Pending operations settled");
                        }
                        return BarrierOutcome::Quiescent { polls };
                    }
                    last = (Some(outstanding), Some(confirmed));
                }
                Err(e) => {
                    warn!(account = %account, error = %e, "Barrier poll failed");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return self.timed_out(account, last);
            }
            let wait = poll_interval.min(deadline - now);

            tokio::select! {
                _ = cancel.cancelled() => return BarrierOutcome::Cancelled,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn read_counts(
        &self,
        account: &AccountId,
    ) -> Result<(u64, u64), shared_types::LedgerError> {
        let outstanding = self.ledger.outstanding_count(account).await?;
        let confirmed = self.ledger.confirmed_count(account).await?;
        Ok((outstanding, confirmed))
    }

    fn timed_out(&self, account: &AccountId, last: (Option<u64>, Option<u64>)) -> BarrierOutcome {
        warn!(
            account = %account,
            outstanding = ?last.0,
            confirmed = ?last.1,
            "Pending barrier timed out, proceeding"
        );
        metrics::record_barrier_timeout();
        BarrierOutcome::TimedOut {
            outstanding: last.0,
            confirmed: last.1,
        }
    }
}

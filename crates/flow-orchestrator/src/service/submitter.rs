//! Transaction submission.

use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::LedgerClient;
use shared_types::{AccountId, LedgerCall, TxHandle};
use std::sync::Arc;
use tracing::{debug, warn};

/// Submits single mutating calls and returns their handles.
#[derive(Clone)]
pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Submit `call` as given. Ledger failures become typed workflow errors.
    pub async fn submit(&self, account: &AccountId, call: LedgerCall) -> WorkflowResult<TxHandle> {
        let label = call.to_string();
        match self.ledger.submit(account, call).await {
            Ok(handle) => {
                debug!(call = %label, tx_handle = %handle.short(), "Call submitted");
                Ok(handle)
            }
            Err(e) => {
                warn!(call = %label, kind = e.kind.as_str(), detail = %e.detail, "Submission failed");
                Err(WorkflowError::from(e))
            }
        }
    }

    /// Submit `template` stamped with the account's current ordering counter.
    ///
    /// The counter is read on every call, so wrapping this in a retry loop
    /// never re-sends a stale value.
    pub async fn submit_fresh(
        &self,
        account: &AccountId,
        template: &LedgerCall,
    ) -> WorkflowResult<TxHandle> {
        let nonce = self.ledger.outstanding_count(account).await?;
        debug!(account = %account, nonce, "Using fresh nonce");
        self.submit(account, template.with_nonce(nonce)).await
    }
}

//! In-memory ledger adapter
//!
//! Implements `LedgerClient` against a deterministic simulated chain.
//! Blocks are produced manually (`mine_block`), on every height query, or by
//! a background producer task. Faults are injected through the test hooks.

use crate::ports::LedgerClient;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{AccountId, BlockHeight, LedgerCall, LedgerError, TxHandle, TxLookup};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct TxRecord {
    account: AccountId,
    call: LedgerCall,
    inclusion_height: Option<BlockHeight>,
}

#[derive(Debug, Default)]
struct AccountState {
    /// Next expected nonce; equals the number of operations issued
    next_nonce: u64,
    confirmed: u64,
}

/// Replayed count sequence. The last value repeats once exhausted.
#[derive(Debug, Default)]
struct ScriptedCounts {
    outstanding: VecDeque<u64>,
    confirmed: VecDeque<u64>,
    last_outstanding: u64,
    last_confirmed: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    height: BlockHeight,
    txs: HashMap<TxHandle, TxRecord>,
    pending: Vec<TxHandle>,
    accounts: HashMap<AccountId, AccountState>,
    executed: HashSet<(String, String)>,
    submitted_nonces: HashMap<AccountId, Vec<u64>>,
    submissions: u64,

    // Fault injection
    conflicts_to_inject: u32,
    rejections: HashMap<String, String>,
    scripted: HashMap<AccountId, ScriptedCounts>,
    mine_on_height_query: bool,
    unavailable: bool,
}

impl LedgerState {
    fn mine(&mut self) -> BlockHeight {
        self.height += 1;
        let height = self.height;
        for handle in std::mem::take(&mut self.pending) {
            if let Some(record) = self.txs.get_mut(&handle) {
                record.inclusion_height = Some(height);
                self.accounts.entry(record.account).or_default().confirmed += 1;
                self.executed
                    .insert((record.call.target.clone(), record.call.method.clone()));
            }
        }
        height
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable {
            Err(LedgerError::from_rpc_message("connection refused"))
        } else {
            Ok(())
        }
    }

    fn submit(&mut self, account: &AccountId, call: LedgerCall) -> Result<TxHandle, LedgerError> {
        self.check_available()?;

        if let Some(reason) = self.rejections.get(&call.method) {
            return Err(LedgerError::rejected(reason.clone()));
        }

        if self.conflicts_to_inject > 0 {
            self.conflicts_to_inject -= 1;
            // Another sender took the nonce first
            self.accounts.entry(*account).or_default().next_nonce += 1;
            return Err(LedgerError::from_rpc_message("nonce too low"));
        }

        let state = self.accounts.entry(*account).or_default();
        let nonce = call.nonce.unwrap_or(state.next_nonce);
        if nonce < state.next_nonce {
            return Err(LedgerError::from_rpc_message(&format!(
                "nonce too low: next nonce {}, tx nonce {}",
                state.next_nonce, nonce
            )));
        }
        if nonce > state.next_nonce {
            return Err(LedgerError::rejected(format!(
                "nonce gap: next nonce {}, tx nonce {}",
                state.next_nonce, nonce
            )));
        }
        state.next_nonce += 1;

        let handle = TxHandle::derive(account, nonce, &call);
        self.submitted_nonces.entry(*account).or_default().push(nonce);
        self.submissions += 1;
        self.pending.push(handle);
        self.txs.insert(
            handle,
            TxRecord {
                account: *account,
                call,
                inclusion_height: None,
            },
        );
        Ok(handle)
    }
}

/// Deterministic in-memory ledger.
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    state: Mutex<LedgerState>,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit synchronously. Same rules as `LedgerClient::submit`.
    pub fn submit_now(&self, account: &AccountId, call: LedgerCall) -> Result<TxHandle, LedgerError> {
        self.state.lock().submit(account, call)
    }

    /// Produce one block including every pending operation.
    pub fn mine_block(&self) -> BlockHeight {
        let height = self.state.lock().mine();
        debug!(height, "Mined block");
        height
    }

    pub fn height(&self) -> BlockHeight {
        self.state.lock().height
    }

    /// Mine a block right after every `current_height` read, so each poll
    /// tick sees the chain one block further.
    pub fn set_mine_on_height_query(&self, enabled: bool) {
        self.state.lock().mine_on_height_query = enabled;
    }

    /// Fail the next `count` submissions with an ordering conflict.
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().conflicts_to_inject = count;
    }

    /// Reject every call to `method` with `reason`.
    pub fn reject_method(&self, method: impl Into<String>, reason: impl Into<String>) {
        self.state
            .lock()
            .rejections
            .insert(method.into(), reason.into());
    }

    /// Make every call fail with a network error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Forget an operation as if it had been replaced. Only the account's
    /// most recent pending submission should be dropped.
    pub fn drop_transaction(&self, handle: &TxHandle) {
        let mut state = self.state.lock();
        state.pending.retain(|h| h != handle);
        if let Some(record) = state.txs.remove(handle) {
            if record.inclusion_height.is_none() {
                let account = state.accounts.entry(record.account).or_default();
                account.next_nonce = account.next_nonce.saturating_sub(1);
            }
        }
    }

    /// Replay these sequences from `outstanding_count` / `confirmed_count`
    /// for `account`, one value per read.
    pub fn script_counts(&self, account: AccountId, outstanding: Vec<u64>, confirmed: Vec<u64>) {
        self.state.lock().scripted.insert(
            account,
            ScriptedCounts {
                outstanding: outstanding.into(),
                confirmed: confirmed.into(),
                ..ScriptedCounts::default()
            },
        );
    }

    /// Mark `target.method` as already applied.
    pub fn seed_executed(&self, target: impl Into<String>, method: impl Into<String>) {
        self.state
            .lock()
            .executed
            .insert((target.into(), method.into()));
    }

    /// Whether a `target.method` call has been included in a block.
    pub fn has_executed(&self, target: &str, method: &str) -> bool {
        self.state
            .lock()
            .executed
            .contains(&(target.to_string(), method.to_string()))
    }

    /// Accepted submissions so far.
    pub fn submission_count(&self) -> u64 {
        self.state.lock().submissions
    }

    /// Nonces of accepted submissions from `account`, in order.
    pub fn submitted_nonces(&self, account: &AccountId) -> Vec<u64> {
        self.state
            .lock()
            .submitted_nonces
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// Mine a block every `interval` until `cancel` fires.
    pub fn spawn_block_producer(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            info!(interval_ms = interval.as_millis() as u64, "Block producer started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        ledger.mine_block();
                    }
                }
            }
            info!(height = ledger.height(), "Block producer stopped");
        })
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn submit(&self, account: &AccountId, call: LedgerCall) -> Result<TxHandle, LedgerError> {
        self.submit_now(account, call)
    }

    async fn lookup(&self, handle: &TxHandle) -> Result<Option<TxLookup>, LedgerError> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state.txs.get(handle).map(|record| TxLookup {
            inclusion_height: record.inclusion_height,
        }))
    }

    async fn current_height(&self) -> Result<BlockHeight, LedgerError> {
        let mut state = self.state.lock();
        state.check_available()?;
        let height = state.height;
        if state.mine_on_height_query {
            state.mine();
        }
        Ok(height)
    }

    async fn outstanding_count(&self, account: &AccountId) -> Result<u64, LedgerError> {
        let mut state = self.state.lock();
        state.check_available()?;
        if let Some(script) = state.scripted.get_mut(account) {
            if let Some(next) = script.outstanding.pop_front() {
                script.last_outstanding = next;
            }
            return Ok(script.last_outstanding);
        }
        Ok(state.accounts.get(account).map_or(0, |a| a.next_nonce))
    }

    async fn confirmed_count(&self, account: &AccountId) -> Result<u64, LedgerError> {
        let mut state = self.state.lock();
        state.check_available()?;
        if let Some(script) = state.scripted.get_mut(account) {
            if let Some(next) = script.confirmed.pop_front() {
                script.last_confirmed = next;
            }
            return Ok(script.last_confirmed);
        }
        Ok(state.accounts.get(account).map_or(0, |a| a.confirmed))
    }
}

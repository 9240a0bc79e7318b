//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use shared_types::{AccountId, BlockHeight, LedgerCall, LedgerError, TxHandle, TxLookup};

/// RPC-style view of the external ledger.
///
/// Implementations are shared across every step and tracker of a run, so
/// they must be safe to call concurrently. Failures carry a typed
/// [`LedgerError`]; adapters talking to a real node translate raw RPC
/// messages with [`LedgerError::from_rpc_message`].
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a mutating call from `account`; returns before inclusion.
    async fn submit(&self, account: &AccountId, call: LedgerCall) -> Result<TxHandle, LedgerError>;

    /// Look up a handle. `None` means the ledger no longer knows it
    /// (dropped or replaced).
    async fn lookup(&self, handle: &TxHandle) -> Result<Option<TxLookup>, LedgerError>;

    /// Height of the latest block.
    async fn current_height(&self) -> Result<BlockHeight, LedgerError>;

    /// Operations issued by `account`, including unconfirmed ones.
    /// This is also the next ordering counter for the account.
    async fn outstanding_count(&self, account: &AccountId) -> Result<u64, LedgerError>;

    /// Operations from `account` that are included in a block.
    async fn confirmed_count(&self, account: &AccountId) -> Result<u64, LedgerError>;
}

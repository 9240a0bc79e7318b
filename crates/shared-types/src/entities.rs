//! # Core Ledger Entities
//!
//! ## Clusters
//!
//! - **Identity**: `AccountId`, `TxHandle`
//! - **Calls**: `LedgerCall`
//! - **Inclusion**: `BlockHeight`, `TxLookup`

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte hash.
pub type Hash = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// Height of a block on the external ledger.
pub type BlockHeight = u64;

/// Opaque identifier returned by the ledger for a submitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TxHandle(pub Hash);

impl TxHandle {
    /// Derive a handle from the submitting account, its nonce and the call.
    ///
    /// Two calls with the same account and nonce but different payloads get
    /// different handles, which is what a replacement looks like on chain.
    pub fn derive(account: &AccountId, nonce: u64, call: &LedgerCall) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(account.0);
        hasher.update(nonce.to_le_bytes());
        hasher.update(call.target.as_bytes());
        hasher.update(call.method.as_bytes());
        hasher.update(call.args.to_string().as_bytes());
        Self(hasher.finalize().into())
    }

    /// Short form used in log lines and step messages.
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// An account on the external ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AccountId(pub Address);

impl AccountId {
    /// Build an account whose every byte is `byte`. Handy for fixtures.
    pub const fn repeat(byte: u8) -> Self {
        Self([byte; 20])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// =============================================================================
// CLUSTER B: CALLS
// =============================================================================

/// One mutating call destined for the ledger.
///
/// `nonce` is the ordering counter. Callers leave it empty; the submitter
/// stamps a freshly read value on every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerCall {
    /// Contract or module the call is addressed to.
    pub target: String,
    /// Method name.
    pub method: String,
    /// Call arguments.
    pub args: serde_json::Value,
    /// Ordering counter for the submitting account.
    pub nonce: Option<u64>,
}

impl LedgerCall {
    /// Create a call without arguments.
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
            args: serde_json::Value::Null,
            nonce: None,
        }
    }

    /// Attach arguments.
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    /// Return a copy stamped with `nonce`.
    pub fn with_nonce(&self, nonce: u64) -> Self {
        let mut call = self.clone();
        call.nonce = Some(nonce);
        call
    }
}

impl fmt::Display for LedgerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.method)
    }
}

// =============================================================================
// CLUSTER C: INCLUSION
// =============================================================================

/// What the ledger knows about a handle it still recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxLookup {
    /// Height of the including block, `None` while still pending.
    pub inclusion_height: Option<BlockHeight>,
}

impl TxLookup {
    /// A known but not yet included operation.
    pub const fn pending() -> Self {
        Self {
            inclusion_height: None,
        }
    }

    /// An operation included at `height`.
    pub const fn included_at(height: BlockHeight) -> Self {
        Self {
            inclusion_height: Some(height),
        }
    }

    /// Confirmation depth at `current_height`.
    ///
    /// The including block counts as the first confirmation; pending
    /// operations have depth zero.
    pub fn confirmations_at(&self, current_height: BlockHeight) -> u64 {
        match self.inclusion_height {
            Some(included) if current_height >= included => current_height - included + 1,
            _ => 0,
        }
    }
}

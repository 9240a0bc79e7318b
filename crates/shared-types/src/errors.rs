//! # Error Types
//!
//! Failures reported by ledger collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of ledger failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerErrorKind {
    /// The ordering counter was stale or already used.
    Conflict,
    /// The ledger refused the call (business-rule revert, bad arguments).
    Rejected,
    /// The ledger could not be reached or did not answer in time.
    Network,
}

impl LedgerErrorKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerErrorKind::Conflict => "conflict",
            LedgerErrorKind::Rejected => "rejected",
            LedgerErrorKind::Network => "network",
        }
    }
}

/// Error returned by a ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {detail}", .kind.as_str())]
pub struct LedgerError {
    /// Failure class.
    pub kind: LedgerErrorKind,
    /// Message as reported by the ledger.
    pub detail: String,
}

/// RPC fragments that identify a stale or duplicate ordering counter.
const CONFLICT_MARKERS: &[&str] = &[
    "nonce too low",
    "nonce has already been used",
    "nonce expired",
    "replacement transaction underpriced",
    "already known",
    "known transaction",
];

/// RPC fragments that identify a transport failure.
const NETWORK_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "network error",
    "service unavailable",
];

impl LedgerError {
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self {
            kind: LedgerErrorKind::Conflict,
            detail: detail.into(),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            kind: LedgerErrorKind::Rejected,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: LedgerErrorKind::Network,
            detail: detail.into(),
        }
    }

    /// Map a raw RPC error message to a typed error.
    ///
    /// Adapters talking to a real node call this once so that everything
    /// above the port works on `LedgerErrorKind` alone.
    pub fn from_rpc_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        let kind = if CONFLICT_MARKERS.iter().any(|m| lowered.contains(m)) {
            LedgerErrorKind::Conflict
        } else if NETWORK_MARKERS.iter().any(|m| lowered.contains(m)) {
            LedgerErrorKind::Network
        } else {
            LedgerErrorKind::Rejected
        };
        Self {
            kind,
            detail: message.to_string(),
        }
    }

    /// Whether this error is a stale-ordering conflict.
    pub fn is_conflict(&self) -> bool {
        self.kind == LedgerErrorKind::Conflict
    }
}

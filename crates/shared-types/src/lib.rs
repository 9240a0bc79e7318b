//! # Shared Types Crate
//!
//! Ledger-facing primitives used by the orchestrator, the event bus and the
//! runtime.
//!
//! ## Design Principles
//!
//! - **Opaque handles**: a `TxHandle` is only ever resolved through the
//!   ledger; nothing in the workspace interprets its bytes.
//! - **Typed failures**: ledger collaborators return a `LedgerError` tagged
//!   with a closed `LedgerErrorKind`. Raw RPC text is mapped to a kind once,
//!   at the adapter boundary.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;

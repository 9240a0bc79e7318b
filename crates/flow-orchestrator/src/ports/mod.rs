//! # Ports Layer
//!
//! - `inbound`: what business workflows and observers call
//! - `outbound`: what the orchestrator needs from the ledger

pub mod inbound;
pub mod outbound;

pub use inbound::WorkflowApi;
pub use outbound::LedgerClient;

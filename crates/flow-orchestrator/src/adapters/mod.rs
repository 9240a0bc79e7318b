//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.

pub mod simulated_ledger;

pub use simulated_ledger::SimulatedLedger;

//! # Flow Runtime
//!
//! Wiring for the `flow-runtime` binary: environment-driven configuration
//! and the demonstration issuance workflow.

pub mod config;
pub mod workflow;

pub use config::RuntimeConfig;
pub use workflow::{issuance_workflow, IssuanceParams};

//! End-to-end workflow tests.

pub mod issuance;
pub mod observer;
pub mod scenarios;

use flow_orchestrator::{
    OrchestratorConfig, SimulatedLedger, StepOutcome, WorkflowRunner, WorkflowStepDef,
};
use std::sync::Arc;

/// Ledger that mines a block every time its head is read, plus a runner on
/// default configuration.
pub fn harness() -> (Arc<SimulatedLedger>, WorkflowRunner) {
    let ledger = Arc::new(SimulatedLedger::new());
    ledger.set_mine_on_height_query(true);
    let runner = WorkflowRunner::new(OrchestratorConfig::default(), ledger.clone())
        .expect("default config is valid");
    (ledger, runner)
}

/// A step that completes immediately.
pub fn ok_step(title: &str) -> WorkflowStepDef {
    WorkflowStepDef::from_fn(title, |_ctx| async { Ok(StepOutcome::done()) })
}


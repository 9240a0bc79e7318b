//! # Ledger-Flow Runtime
//!
//! Runs the issuance workflow against a simulated ledger.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load configuration from `FLOW_*` variables and validate it
//! 3. Start the simulated block producer
//! 4. Attach a logger to the workflow event bus
//! 5. Run the workflow until it finishes or Ctrl+C arrives
//! 6. Print the final snapshot as JSON

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flow_orchestrator::{SimulatedLedger, WorkflowApi, WorkflowEvent, WorkflowRunner};
use flow_runtime::{issuance_workflow, IssuanceParams, RuntimeConfig};
use flow_telemetry::{component_span, init_telemetry, log_event, TelemetryConfig};
use shared_bus::EventStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("runtime"))
        .context("failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env();
    config
        .orchestrator
        .validate()
        .context("invalid orchestrator configuration")?;

    let shutdown = CancellationToken::new();
    let ledger = Arc::new(SimulatedLedger::new());
    let producer = ledger.spawn_block_producer(config.block_time(), shutdown.child_token());

    let runner = WorkflowRunner::new(config.orchestrator.clone(), ledger.clone())
        .context("failed to build workflow runner")?;
    let logger = tokio::spawn(log_events(runner.event_stream(Vec::new())));

    info!(block_time_ms = config.block_time_ms, "Starting issuance workflow");
    let steps = issuance_workflow(ledger.clone(), IssuanceParams::default());

    let span = component_span!("issuance", component = "runtime");

    let outcome = tokio::select! {
        result = runner.run(steps).instrument(span) => Some(result),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, resetting workflow");
            runner.reset();
            None
        }
    };

    shutdown.cancel();
    if let Err(e) = producer.await {
        warn!(error = %e, "Block producer task failed");
    }
    drop(runner);
    // Lets the logger drain what is buffered; a straggling tracker task may
    // still hold the bus open.
    if tokio::time::timeout(Duration::from_millis(200), logger).await.is_err() {
        warn!("Event logger did not stop in time");
    }

    let Some(result) = outcome else {
        bail!("workflow interrupted");
    };
    let snapshot = result.context("workflow run failed")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if !snapshot.succeeded() {
        bail!("workflow finished with errors: {:?}", snapshot.result.errors());
    }
    info!(height = ledger.height(), "Workflow completed");
    Ok(())
}

async fn log_events(mut events: EventStream<WorkflowEvent>) {
    while let Some(event) = events.next().await {
        let snapshot = event.snapshot();
        log_event!(
            info,
            "bus",
            "Workflow event",
            event = event.name(),
            run_id = %event.run_id(),
            cursor = snapshot.state.current_step(),
            total = snapshot.state.total_steps()
        );
    }
}

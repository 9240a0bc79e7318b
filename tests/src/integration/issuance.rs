//! # Issuance Run
//!
//! The runtime's issuance workflow driven end to end: configuration from
//! `FLOW_*` variables, a block producer mining on its own schedule, and
//! observers attached the way the binary attaches them.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use flow_orchestrator::{
        SimulatedLedger, StepStatus, WorkflowApi, WorkflowEvent, WorkflowRunner, WorkflowTopic,
    };
    use flow_runtime::{issuance_workflow, IssuanceParams, RuntimeConfig};
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_bus::Subscription;
    use tokio::task::JoinHandle;
    use tokio_stream::StreamExt;
    use tokio_util::sync::CancellationToken;

    fn config(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    /// Collect every event the subscription yields until the run finishes.
    fn record(
        mut events: Subscription<WorkflowEvent>,
    ) -> (Arc<Mutex<Vec<WorkflowEvent>>>, JoinHandle<()>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let done = matches!(event, WorkflowEvent::RunFinished { .. });
                sink.lock().push(event);
                if done {
                    break;
                }
            }
        });
        (seen, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_issuance_against_block_producer() {
        let config = config(&[
            ("FLOW_BLOCK_TIME_MS", "500"),
            ("FLOW_TRACKER_POLL_MS", "250"),
            ("FLOW_REQUIRED_CONFIRMATIONS", "3"),
        ]);
        assert_eq!(config.orchestrator.tracker.default_required_confirmations, 3);

        let shutdown = CancellationToken::new();
        let ledger = Arc::new(SimulatedLedger::new());
        let producer = ledger.spawn_block_producer(config.block_time(), shutdown.child_token());
        let runner = WorkflowRunner::new(config.orchestrator.clone(), ledger.clone()).unwrap();

        let (seen, observer) = record(runner.subscribe(Vec::new()));
        let mut lifecycle = runner.event_stream(vec![WorkflowTopic::Lifecycle]);

        let snap = runner
            .run(issuance_workflow(ledger.clone(), IssuanceParams::default()))
            .await
            .unwrap();
        shutdown.cancel();
        producer.await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), observer)
            .await
            .expect("observer should finish")
            .unwrap();

        assert!(snap.succeeded(), "{:?}", snap.result.errors());
        assert_eq!(snap.result.payload().get("minted"), Some(&json!(1_000)));
        assert_eq!(ledger.submission_count(), 3);
        let mint = snap.state.step(3).unwrap();
        assert_eq!(mint.status(), StepStatus::Completed);
        assert!(mint.confirmations.unwrap() >= 3);

        // Every step went through in-progress before completing
        let seen = seen.lock();
        for id in 1..=3 {
            let statuses: Vec<StepStatus> = seen
                .iter()
                .filter_map(|event| match event {
                    WorkflowEvent::StepUpdated { step_id, status, .. } if *step_id == id => {
                        Some(*status)
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(statuses.first(), Some(&StepStatus::InProgress), "step {id}");
            assert_eq!(statuses.last(), Some(&StepStatus::Completed), "step {id}");
        }
        assert_eq!(seen.last().unwrap().snapshot(), &snap);

        let first = lifecycle.next().await.unwrap();
        assert_eq!(first.name(), "run_initialized");
        assert_eq!(first.run_id(), snap.run_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_mint_fails_through_observers() {
        let config = config(&[("FLOW_BLOCK_TIME_MS", "200"), ("FLOW_TRACKER_POLL_MS", "100")]);
        let shutdown = CancellationToken::new();
        let ledger = Arc::new(SimulatedLedger::new());
        ledger.reject_method("mint", "caller is not owner");
        let producer = ledger.spawn_block_producer(config.block_time(), shutdown.child_token());
        let runner = WorkflowRunner::new(config.orchestrator, ledger.clone()).unwrap();

        let (seen, observer) =
            record(runner.subscribe(vec![WorkflowTopic::Steps, WorkflowTopic::Lifecycle]));
        let snap = runner
            .run(issuance_workflow(ledger.clone(), IssuanceParams::default()))
            .await
            .unwrap();
        shutdown.cancel();
        producer.await.unwrap();
        observer.await.unwrap();

        assert!(!snap.succeeded());
        assert_eq!(snap.result.errors(), ["Mint tokens: caller is not owner"]);

        let seen = seen.lock();
        let failed = seen
            .iter()
            .find(|e| {
                matches!(
                    e,
                    WorkflowEvent::StepUpdated {
                        step_id: 3,
                        status: StepStatus::Failed,
                        ..
                    }
                )
            })
            .expect("mint failure published");
        assert!(!failed.snapshot().result.success());
        assert!(matches!(
            seen.last(),
            Some(WorkflowEvent::RunFinished { success: false, .. })
        ));
        drop(seen);
        runner.reset();
        assert!(runner.snapshot().is_none());
    }
}

//! # Observer Contract
//!
//! Every state mutation of a run reaches subscribers as exactly one event
//! carrying the snapshot taken right after it. Resets publish the last
//! state of the discarded run; cosmetic toggles publish nothing.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use flow_orchestrator::{StepStatus, StepUpdate, WorkflowApi, WorkflowEvent, WorkflowTopic};
    use tokio::time::timeout;

    use crate::integration::{harness, ok_step};

    fn names(events: &[WorkflowEvent]) -> Vec<&'static str> {
        events.iter().map(WorkflowEvent::name).collect()
    }

    #[tokio::test]
    async fn test_one_event_per_mutation() {
        let (_ledger, runner) = harness();
        let mut all = runner.subscribe(Vec::new());

        let snap = runner.run(vec![ok_step("A"), ok_step("B")]).await.unwrap();
        let events = all.drain();

        assert_eq!(
            names(&events),
            [
                "run_initialized",
                "cursor_advanced",
                "step_updated",
                "step_updated",
                "cursor_advanced",
                "step_updated",
                "step_updated",
                "run_finished",
            ]
        );
        assert!(events.iter().all(|e| e.run_id() == snap.run_id));

        // Snapshots are taken after the mutation they announce
        let statuses: Vec<(u32, StepStatus)> = events
            .iter()
            .filter_map(|event| match event {
                WorkflowEvent::StepUpdated {
                    step_id,
                    status,
                    snapshot,
                    ..
                } => {
                    assert_eq!(snapshot.state.step(*step_id).unwrap().status(), *status);
                    Some((*step_id, *status))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            [
                (1, StepStatus::InProgress),
                (1, StepStatus::Completed),
                (2, StepStatus::InProgress),
                (2, StepStatus::Completed),
            ]
        );
        assert_eq!(events.last().unwrap().snapshot(), &snap);
    }

    #[tokio::test]
    async fn test_rejected_update_publishes_nothing() {
        let (_ledger, runner) = harness();
        runner.initialize(vec!["A".into()]).unwrap();
        let mut all = runner.subscribe(Vec::new());

        assert!(runner
            .update(1, StepUpdate::completed(None))
            .is_err());
        assert!(all.drain().is_empty());
    }

    #[tokio::test]
    async fn test_manual_failure_sticks_in_every_later_snapshot() {
        let (_ledger, runner) = harness();
        runner
            .initialize(vec!["A".into(), "B".into()])
            .unwrap();
        let mut all = runner.subscribe(Vec::new());

        runner.advance(1).unwrap();
        runner.update(1, StepUpdate::in_progress()).unwrap();
        runner.update(1, StepUpdate::failed("boom")).unwrap();
        runner.push_message("still here").unwrap();
        runner.advance(2).unwrap();
        runner.update(2, StepUpdate::in_progress()).unwrap();
        runner.update(2, StepUpdate::completed(None)).unwrap();

        let events = all.drain();
        let failed_at = events
            .iter()
            .position(|e| {
                matches!(
                    e,
                    WorkflowEvent::StepUpdated {
                        status: StepStatus::Failed,
                        ..
                    }
                )
            })
            .unwrap();
        assert!(events[..failed_at]
            .iter()
            .all(|e| e.snapshot().result.success()));
        for event in &events[failed_at..] {
            assert!(!event.snapshot().result.success(), "{}", event.name());
            assert_eq!(event.snapshot().result.errors(), ["A: boom"]);
        }

        let snap = runner.snapshot().unwrap();
        assert!(!snap.succeeded());
        assert_eq!(snap.result.messages(), ["still here"]);
    }

    #[tokio::test]
    async fn test_reset_publishes_last_state() {
        let (_ledger, runner) = harness();
        let run_id = runner
            .initialize(vec!["A".into(), "B".into()])
            .unwrap();
        runner.advance(1).unwrap();
        runner.update(1, StepUpdate::in_progress()).unwrap();

        let mut lifecycle = runner.subscribe(vec![WorkflowTopic::Lifecycle]);
        runner.reset();

        let events = lifecycle.drain();
        assert_eq!(names(&events), ["run_reset"]);
        let last = events[0].snapshot();
        assert_eq!(events[0].run_id(), run_id);
        assert_eq!(last.state.step(1).unwrap().status(), StepStatus::InProgress);
        assert!(runner.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_topic_filter_and_details_toggle() {
        let (_ledger, runner) = harness();
        runner.initialize(vec!["A".into()]).unwrap();
        let mut log = runner.subscribe(vec![WorkflowTopic::Log]);

        runner.advance(1).unwrap();
        runner.push_message("hello").unwrap();
        assert!(runner.toggle_details().unwrap());

        let events = log.drain();
        assert_eq!(names(&events), ["message"]);
        assert!(runner.snapshot().unwrap().state.show_details);
    }

    #[tokio::test]
    async fn test_concurrent_observer_sees_run_to_completion() {
        let (_ledger, runner) = harness();
        let mut sub = runner.subscribe(Vec::new());

        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = sub.recv().await {
                let done = matches!(event, WorkflowEvent::RunFinished { .. });
                seen.push(event);
                if done {
                    break;
                }
            }
            seen
        });

        let snap = runner
            .run(vec![ok_step("A"), ok_step("B"), ok_step("C")])
            .await
            .unwrap();
        let seen = timeout(Duration::from_secs(1), observer)
            .await
            .expect("observer should finish")
            .unwrap();

        assert_eq!(seen.len(), 1 + 3 * 3 + 1);
        let progress: Vec<usize> = seen
            .iter()
            .map(|e| e.snapshot().state.current_step())
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().unwrap().snapshot(), &snap);
    }

    #[tokio::test]
    async fn test_new_run_gets_fresh_id() {
        let (_ledger, runner) = harness();
        let first = runner.run(vec![ok_step("A")]).await.unwrap();
        runner.reset();
        let second = runner.run(vec![ok_step("A")]).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert!(second.succeeded());
    }
}

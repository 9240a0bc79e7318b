//! # Workflow Scenarios
//!
//! Full runs through `WorkflowRunner` against the simulated ledger:
//!
//! 1. Every step succeeds
//! 2. A rejected submission halts the run
//! 3. Ordering conflicts are retried with growing delays
//! 4. Idempotent setup runs its action once
//! 5. The pending barrier waits for the account to settle
//! 6. Confirmation depth is reported tick by tick

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use flow_orchestrator::{
        classify, BarrierOutcome, GuardOutcome, RetryPolicy, StepOutcome, StepStatus,
        WorkflowApi, WorkflowError, WorkflowEvent, WorkflowStepDef, WorkflowTopic,
    };
    use proptest::prelude::*;
    use serde_json::json;
    use shared_types::{AccountId, LedgerCall};
    use tokio::time::Instant;

    use crate::integration::{harness, ok_step};

    const ALICE: AccountId = AccountId::repeat(0xA1);

    // =========================================================================
    // FIXTURES
    // =========================================================================

    fn rejected_step(title: &str, reason: &str) -> WorkflowStepDef {
        let reason = reason.to_string();
        WorkflowStepDef::from_fn(title, move |_ctx| {
            let reason = reason.clone();
            async move { Err(WorkflowError::SubmissionRejected { reason }) }
        })
    }

    /// Step guarding a shared goal flag; counts how often it had to act.
    fn guarded_step(title: &str, goal: Arc<AtomicBool>, acts: Arc<AtomicU32>) -> WorkflowStepDef {
        WorkflowStepDef::from_fn(title, move |ctx| {
            let goal = goal.clone();
            let acts = acts.clone();
            async move {
                let (goal, acts) = (&goal, &acts);
                let outcome = ctx
                    .ensure(
                        "module bound",
                        || async move { Ok(goal.load(Ordering::SeqCst)) },
                        || async move {
                            acts.fetch_add(1, Ordering::SeqCst);
                            goal.store(true, Ordering::SeqCst);
                            Ok(())
                        },
                        || async move { Ok(goal.load(Ordering::SeqCst)) },
                    )
                    .await?;
                Ok(StepOutcome::with_info(match outcome {
                    GuardOutcome::Achieved => "achieved",
                    GuardOutcome::AlreadySatisfied => "skipped",
                }))
            }
        })
    }

    // =========================================================================
    // SCENARIO 1 & 2: RUN OUTCOME
    // =========================================================================

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let (_ledger, runner) = harness();
        let mut lifecycle = runner.subscribe(vec![WorkflowTopic::Lifecycle]);

        let snap = runner
            .run(vec![ok_step("A"), ok_step("B"), ok_step("C")])
            .await
            .unwrap();

        assert_eq!(snap.state.current_step(), 3);
        assert_eq!(snap.state.count_with(StepStatus::Completed), 3);
        assert!(snap.result.success());

        let events = lifecycle.drain();
        assert!(matches!(
            events.last(),
            Some(WorkflowEvent::RunFinished { success: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_rejection_halts_run() {
        let (_ledger, runner) = harness();
        let mut steps = runner.subscribe(vec![WorkflowTopic::Steps]);

        let snap = runner
            .run(vec![
                ok_step("A"),
                rejected_step("B", "caller is not owner"),
                ok_step("C"),
            ])
            .await
            .unwrap();

        let b = snap.state.step(2).unwrap();
        assert_eq!(b.status(), StepStatus::Failed);
        assert_eq!(b.error.as_deref(), Some("caller is not owner"));
        assert_eq!(snap.state.step(3).unwrap().status(), StepStatus::Pending);
        assert!(!snap.result.success());

        assert_eq!(snap.result.errors(), ["B: caller is not owner"]);

        // The failure and its error land in the same event
        let failed: Vec<WorkflowEvent> = steps
            .drain()
            .into_iter()
            .filter(|event| {
                matches!(
                    event,
                    WorkflowEvent::StepUpdated {
                        status: StepStatus::Failed,
                        ..
                    }
                )
            })
            .collect();
        assert_eq!(failed.len(), 1);
        let at_failure = failed[0].snapshot();
        assert!(!at_failure.result.success());
        assert_eq!(at_failure.result.errors(), ["B: caller is not owner"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// The run succeeds iff every step completed; the first failure
        /// leaves every later step pending.
        #[test]
        fn prop_run_success_is_and_of_steps(outcomes in prop::collection::vec(any::<bool>(), 1..8)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let snap = rt.block_on(async {
                let (_ledger, runner) = harness();
                let steps = outcomes
                    .iter()
                    .enumerate()
                    .map(|(i, ok)| {
                        let title = format!("step-{i}");
                        if *ok { ok_step(&title) } else { rejected_step(&title, "rejected") }
                    })
                    .collect();
                runner.run(steps).await.unwrap()
            });

            let all_ok = outcomes.iter().all(|ok| *ok);
            prop_assert_eq!(snap.result.success(), all_ok);
            prop_assert_eq!(snap.succeeded(), all_ok);

            let first_failure = outcomes.iter().position(|ok| !ok);
            for (idx, step) in snap.state.steps().iter().enumerate() {
                let expected = match first_failure {
                    Some(f) if idx < f => StepStatus::Completed,
                    Some(f) if idx == f => StepStatus::Failed,
                    Some(_) => StepStatus::Pending,
                    None => StepStatus::Completed,
                };
                prop_assert_eq!(step.status(), expected);
            }
        }
    }

    // =========================================================================
    // SCENARIO 3: RETRY
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_conflicts_retried_with_backoff() {
        let (_ledger, runner) = harness();
        let calls = Arc::new(AtomicU32::new(0));

        let step = {
            let calls = calls.clone();
            WorkflowStepDef::from_fn("Submit", move |ctx| {
                let calls = calls.clone();
                async move {
                    ctx.retry(
                        || {
                            let calls = calls.clone();
                            async move {
                                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                                    Err(WorkflowError::Conflict {
                                        detail: "nonce too low".into(),
                                    })
                                } else {
                                    Ok(())
                                }
                            }
                        },
                        classify,
                    )
                    .await?;
                    Ok(StepOutcome::done())
                }
            })
        };

        let start = Instant::now();
        let snap = runner.run(vec![step]).await.unwrap();
        let elapsed = start.elapsed();

        assert!(snap.succeeded());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2000 ms + 3000 ms of backoff
        assert!(elapsed >= Duration::from_millis(5000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(5100), "{elapsed:?}");
    }

    /// Step retrying an action that conflicts `k` times, under `policy`.
    fn conflicting_step(k: u32, policy: RetryPolicy, calls: Arc<AtomicU32>) -> WorkflowStepDef {
        WorkflowStepDef::from_fn("Submit", move |ctx| {
            let calls = calls.clone();
            let policy = policy.clone();
            async move {
                ctx.retry_with(
                    &policy,
                    || {
                        let calls = calls.clone();
                        async move {
                            if calls.fetch_add(1, Ordering::SeqCst) < k {
                                Err(WorkflowError::Conflict {
                                    detail: "nonce too low".into(),
                                })
                            } else {
                                Ok(())
                            }
                        }
                    },
                    classify,
                )
                .await?;
                Ok(StepOutcome::done())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_retry_policy() {
        let (_ledger, runner) = harness();

        // Nine invocations outlast five conflicts the default policy would not
        let patient = RetryPolicy {
            max_retries: 9,
            ..RetryPolicy::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let snap = runner
            .run(vec![conflicting_step(5, patient, calls.clone())])
            .await
            .unwrap();
        assert!(snap.succeeded(), "{:?}", snap.result.errors());
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        runner.reset();
        let tight = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let snap = runner
            .run(vec![conflicting_step(2, tight, calls.clone())])
            .await
            .unwrap();
        assert!(!snap.result.success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(snap
            .state
            .step(1)
            .unwrap()
            .error
            .as_deref()
            .unwrap()
            .starts_with("Retries exhausted after 2 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_conflicts_resolved_with_fresh_nonce() {
        let (ledger, runner) = harness();
        ledger.inject_conflicts(2);

        let step = WorkflowStepDef::from_fn("Mint", |ctx| async move {
            ctx.submit_and_confirm(&ALICE, &LedgerCall::new("token", "mint"), None)
                .await?;
            Ok(StepOutcome::done())
        });

        let snap = runner.run(vec![step]).await.unwrap();

        assert!(snap.succeeded(), "{:?}", snap.result.errors());
        assert_eq!(ledger.submitted_nonces(&ALICE), vec![2]);
        assert!(ledger.has_executed("token", "mint"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_conflicts_exhaust_retries() {
        let (ledger, runner) = harness();
        ledger.inject_conflicts(5);

        let step = WorkflowStepDef::from_fn("Mint", |ctx| async move {
            ctx.submit_with_retry(&ALICE, &LedgerCall::new("token", "mint"))
                .await?;
            Ok(StepOutcome::done())
        });

        let snap = runner.run(vec![step]).await.unwrap();
        let mint = snap.state.step(1).unwrap();

        assert_eq!(mint.status(), StepStatus::Failed);
        assert!(mint
            .error
            .as_deref()
            .unwrap()
            .starts_with("Retries exhausted after 5 attempts"));
        assert_eq!(ledger.submission_count(), 0);
    }

    // =========================================================================
    // SCENARIO 4: IDEMPOTENT SETUP
    // =========================================================================

    #[tokio::test]
    async fn test_guard_acts_once_across_steps() {
        let (_ledger, runner) = harness();
        let goal = Arc::new(AtomicBool::new(false));
        let acts = Arc::new(AtomicU32::new(0));

        let snap = runner
            .run(vec![
                guarded_step("Bind", goal.clone(), acts.clone()),
                guarded_step("Bind again", goal.clone(), acts.clone()),
            ])
            .await
            .unwrap();

        assert!(snap.succeeded());
        assert_eq!(acts.load(Ordering::SeqCst), 1);
        assert_eq!(snap.state.step(1).unwrap().complete_info.as_deref(), Some("achieved"));
        assert_eq!(snap.state.step(2).unwrap().complete_info.as_deref(), Some("skipped"));
        assert!(snap
            .result
            .messages()
            .iter()
            .any(|m| m == "module bound: already satisfied, skipping"));
    }

    #[tokio::test]
    async fn test_unverified_goal_fails_step() {
        let (_ledger, runner) = harness();
        let step = WorkflowStepDef::from_fn("Bind", |ctx| async move {
            ctx.ensure(
                "module bound",
                || async { Ok(false) },
                || async { Ok(()) },
                || async { Ok(false) },
            )
            .await?;
            Ok(StepOutcome::done())
        });

        let snap = runner.run(vec![step]).await.unwrap();

        assert_eq!(
            snap.state.step(1).unwrap().error.as_deref(),
            Some("Precondition not achieved: module bound")
        );
    }

    // =========================================================================
    // SCENARIO 5: PENDING BARRIER
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_barrier_waits_for_counts_to_match() {
        let (ledger, runner) = harness();
        ledger.script_counts(ALICE, vec![5, 5, 3], vec![3, 4, 3]);

        let step = WorkflowStepDef::from_fn("Settle", |ctx| async move {
            if let BarrierOutcome::Quiescent { polls } = ctx.await_quiescence(&ALICE).await? {
                ctx.set_payload("polls", json!(polls))?;
            }
            Ok(StepOutcome::done())
        });

        let start = Instant::now();
        let snap = runner.run(vec![step]).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(snap.result.payload().get("polls"), Some(&json!(3)));
        assert!(elapsed >= Duration::from_millis(2000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2100), "{elapsed:?}");
        assert!(snap.result.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_barrier_timeout_lets_step_proceed() {
        let (ledger, runner) = harness();
        ledger.script_counts(ALICE, vec![2], vec![1]);

        let step = WorkflowStepDef::from_fn("Settle", |ctx| async move {
            ctx.await_quiescence(&ALICE).await?;
            Ok(StepOutcome::with_info("proceeded"))
        });

        let snap = runner.run(vec![step]).await.unwrap();

        assert!(snap.succeeded());
        assert!(snap.result.messages()[0].starts_with("Timed out after 30000 ms"));
    }

    // =========================================================================
    // SCENARIO 6: CONFIRMATION TRACKING
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_confirmations_reported_per_tick() {
        let (ledger, runner) = harness();
        let mut steps_topic = runner.subscribe(vec![WorkflowTopic::Steps]);

        let step = {
            let ledger = ledger.clone();
            WorkflowStepDef::from_fn("Mint", move |ctx| {
                let ledger = ledger.clone();
                async move {
                    let handle = ctx
                        .submit_with_retry(&ALICE, &LedgerCall::new("token", "mint"))
                        .await?;
                    ledger.mine_block();
                    ctx.await_confirmations(handle, 12).await?;
                    Ok(StepOutcome::done())
                }
            })
        };

        let snap = runner.run(vec![step]).await.unwrap();
        let mint = snap.state.step(1).unwrap();
        assert_eq!(mint.confirmations, Some(12));
        assert_eq!(mint.estimated_time_left, Some(0));

        let reported: Vec<u64> = steps_topic
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                WorkflowEvent::StepUpdated {
                    status: StepStatus::InProgress,
                    snapshot,
                    ..
                } => snapshot.state.step(1).and_then(|s| s.confirmations),
                _ => None,
            })
            .collect();
        assert_eq!(reported, (1..=12).collect::<Vec<_>>());
    }
}

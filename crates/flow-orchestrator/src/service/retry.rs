//! Retry-with-backoff around any fallible async action.

use crate::domain::{RetryContext, RetryPolicy};
use crate::error::{ErrorClass, WorkflowError, WorkflowResult};
use crate::metrics;
use std::future::Future;
use tracing::{info, warn};

/// Re-invokes an action while it fails with an ordering conflict.
///
/// The action is called anew on every attempt and must recompute any
/// ordering-sensitive input itself; the controller keeps nothing between
/// attempts except the delay.
#[derive(Clone, Debug, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn retry<T, F, Fut, C>(&self, action: F, classify: C) -> WorkflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
        C: Fn(&WorkflowError) -> ErrorClass,
    {
        self.retry_with_context(action, classify).await.0
    }

    /// Like [`retry`](Self::retry) under `policy` instead of the
    /// controller's own, for one call.
    pub async fn retry_with<T, F, Fut, C>(
        &self,
        policy: &RetryPolicy,
        action: F,
        classify: C,
    ) -> WorkflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
        C: Fn(&WorkflowError) -> ErrorClass,
    {
        run_with_policy(policy, action, classify).await.0
    }

    /// Like [`retry`](Self::retry), also returning the bookkeeping of the
    /// call (attempts made, delays slept, last error).
    pub async fn retry_with_context<T, F, Fut, C>(
        &self,
        action: F,
        classify: C,
    ) -> (WorkflowResult<T>, RetryContext)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
        C: Fn(&WorkflowError) -> ErrorClass,
    {
        run_with_policy(&self.policy, action, classify).await
    }
}

async fn run_with_policy<T, F, Fut, C>(
    policy: &RetryPolicy,
    mut action: F,
    classify: C,
) -> (WorkflowResult<T>, RetryContext)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WorkflowResult<T>>,
    C: Fn(&WorkflowError) -> ErrorClass,
{
    let mut ctx = RetryContext::new(policy);

    loop {
        let err = match action().await {
            Ok(value) => {
                if ctx.attempt > 0 {
                    info!(attempts = ctx.invocations(), "Succeeded after retry");
                }
                return (Ok(value), ctx);
            }
            Err(err) => err,
        };

        if classify(&err) == ErrorClass::Fatal {
            ctx.last_error = Some(err.clone());
            return (Err(err), ctx);
        }

        metrics::record_conflict();

        if !ctx.attempts_remain() {
            warn!(attempts = ctx.invocations(), error = %err, "Retries exhausted");
            metrics::record_retries_exhausted();
            let exhausted = WorkflowError::RetriesExhausted {
                attempts: ctx.invocations(),
                last: Box::new(err.clone()),
            };
            ctx.last_error = Some(err);
            return (Err(exhausted), ctx);
        }

        let delay = ctx.step(policy);
        warn!(
            attempt = ctx.attempt,
            max_retries = ctx.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Ordering conflict, retrying"
        );
        ctx.last_error = Some(err);
        metrics::record_retry_attempt();
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn conflict() -> WorkflowError {
        WorkflowError::Conflict {
            detail: "nonce too low".into(),
        }
    }

    /// Action failing with a conflict `k` times, then succeeding.
    fn flaky(k: u32, calls: Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<WorkflowResult<u32>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < k { Err(conflict()) } else { Ok(n + 1) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_conflicts() {
        let calls = Arc::new(AtomicU32::new(0));
        let controller = RetryController::default();

        let (result, ctx) = controller
            .retry_with_context(flaky(2, calls.clone()), classify)
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            ctx.delays,
            vec![Duration::from_millis(2000), Duration::from_millis(3000)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_are_real_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let controller = RetryController::default();
        let start = tokio::time::Instant::now();

        controller.retry(flaky(2, calls), classify).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5000));
        assert!(elapsed < Duration::from_millis(5100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_invocations() {
        for k in [5u32, 9] {
            let calls = Arc::new(AtomicU32::new(0));
            let controller = RetryController::default();

            let err = controller
                .retry(flaky(k, calls.clone()), classify)
                .await
                .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 5);
            match err {
                WorkflowError::RetriesExhausted { attempts, last } => {
                    assert_eq!(attempts, 5);
                    assert!(matches!(*last, WorkflowError::Conflict { .. }));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_policy_overrides_default() {
        let controller = RetryController::default();

        let tight = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let err = controller
            .retry_with(&tight, flaky(5, calls.clone()), classify)
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(err, WorkflowError::RetriesExhausted { attempts: 2, .. }));

        let patient = RetryPolicy {
            max_retries: 9,
            initial_delay_ms: 10,
            ..RetryPolicy::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let value = controller
            .retry_with(&patient, flaky(5, calls.clone()), classify)
            .await
            .unwrap();
        assert_eq!(value, 6);
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        // The controller's own policy is untouched
        assert_eq!(controller.policy().max_retries, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let controller = RetryController::default();

        let err = controller
            .retry(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err::<(), _>(WorkflowError::SubmissionRejected {
                            reason: "caller is not owner".into(),
                        })
                    }
                },
                classify,
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_string(), "caller is not owner");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_classifier() {
        // Treat network errors as retryable too
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let controller = RetryController::default();

        let result = controller
            .retry(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err(WorkflowError::LedgerUnavailable {
                                detail: "connection reset".into(),
                            })
                        } else {
                            Ok(n)
                        }
                    }
                },
                |e: &WorkflowError| match e {
                    WorkflowError::LedgerUnavailable { .. } => ErrorClass::Conflict,
                    other => other.class(),
                },
            )
            .await;

        assert_eq!(result.unwrap(), 1);
    }
}

//! Tests for the retry loop.

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_test::traced_test;

/// An operation that fails `fail_times` times before returning 42.
fn failing_then(
    fail_times: u32,
    calls: Arc<AtomicU32>,
) -> impl FnMut() -> std::future::Ready<Result<i32, String>> {
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(if n < fail_times {
            Err("rate limited".to_string())
        } else {
            Ok(42)
        })
    }
}

#[tokio::test]
async fn test_success_on_first_attempt_runs_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let runner = RetryRunner::new(RetryPolicy::new(5));

    let result = runner.run(failing_then(0, calls.clone())).await;

    assert_eq!(result, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[traced_test]
async fn test_rate_limited_twice_then_succeeds() {
    let calls = Arc::new(AtomicU32::new(0));
    let runner = RetryRunner::new(RetryPolicy::new(3));

    let result = runner.run(failing_then(2, calls.clone())).await;

    assert_eq!(result, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    logs_assert(|lines: &[&str]| {
        let failures = lines
            .iter()
            .filter(|line| line.contains("attempt failed, retrying"))
            .count();
        match failures {
            2 => Ok(()),
            n => Err(format!("expected 2 logged failures, got {}", n)),
        }
    });
    assert!(logs_contain("rate limited"));
}

#[tokio::test]
#[traced_test]
async fn test_always_failing_runs_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let runner = RetryRunner::new(RetryPolicy::new(4));

    let exhausted = runner
        .run(failing_then(u32::MAX, calls.clone()))
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(exhausted.attempts, 4);
    assert_eq!(
        exhausted.last_error,
        AttemptError::Failed("rate limited".to_string())
    );
    assert!(logs_contain("giving up on operation"));
}

#[tokio::test]
async fn test_single_attempt_policy_does_not_retry() {
    let calls = Arc::new(AtomicU32::new(0));

    let exhausted = retry(failing_then(1, calls.clone()), &RetryPolicy::once())
        .await
        .unwrap_err();

    assert_eq!(exhausted.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_last_error_is_kept_unchanged() {
    let calls = Arc::new(AtomicU32::new(0));
    let runner = RetryRunner::new(RetryPolicy::new(3));

    let exhausted = runner
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(format!("failure #{}", n + 1)) }
        })
        .await
        .unwrap_err();

    assert_eq!(exhausted.into_source(), Some("failure #3".to_string()));
}

#[tokio::test]
async fn test_run_if_stops_on_permanent_error() {
    #[derive(Debug, PartialEq, Clone)]
    enum FetchError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for FetchError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    let calls = AtomicU32::new(0);
    let runner = RetryRunner::new(RetryPolicy::new(5));

    let exhausted = runner
        .run_if(
            || async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err::<(), _>(FetchError::Transient),
                    _ => Err(FetchError::Permanent),
                }
            },
            |err| matches!(err, FetchError::Transient),
        )
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(exhausted.attempts, 2);
    assert_eq!(exhausted.into_source(), Some(FetchError::Permanent));
}

#[tokio::test]
async fn test_hooks_see_every_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let events = Mutex::new(Vec::new());
    let runner = RetryRunner::new(RetryPolicy::new(3));

    let result = runner
        .run_with_hooks(failing_then(u32::MAX, calls.clone()), |event| {
            events
                .lock()
                .unwrap()
                .push((event.attempt, event.will_retry));
        })
        .await;

    assert!(result.is_err());
    assert_eq!(
        *events.lock().unwrap(),
        vec![(1, true), (2, true), (3, false)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_counts_as_failed_attempt() {
    let calls = AtomicU32::new(0);
    let runner = RetryRunner::new(RetryPolicy::new(3).with_timeout(Duration::from_millis(50)));

    let result = runner
        .run(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok::<_, String>("done")
        })
        .await;

    assert_eq!(result, Ok("done"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_all_attempts_timing_out() {
    let runner = RetryRunner::new(RetryPolicy::new(2).with_timeout(Duration::from_millis(10)));

    let exhausted = runner
        .run(|| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, String>(())
        })
        .await
        .unwrap_err();

    assert!(exhausted.timed_out());
    assert_eq!(exhausted.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_between_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = RetryPolicy::new(4).with_backoff(Backoff::Exponential {
        base: Duration::from_millis(100),
    });
    let start = tokio::time::Instant::now();

    let result = RetryRunner::new(policy)
        .run(failing_then(3, calls.clone()))
        .await;

    assert_eq!(result, Ok(42));
    // 100ms + 200ms + 400ms
    assert!(start.elapsed() >= Duration::from_millis(700));
}

#[tokio::test]
async fn test_no_backoff_retries_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = std::time::Instant::now();

    let result = RetryRunner::new(RetryPolicy::new(5))
        .run(failing_then(4, calls.clone()))
        .await;

    assert_eq!(result, Ok(42));
    assert!(start.elapsed() < Duration::from_secs(1));
}

//! The retry loop that interprets a [`RetryPolicy`].

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::retry::{AttemptError, RetryExhausted, RetryPolicy};

/// Information about a failed attempt, passed to hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a AttemptError<E>,
    /// Whether another attempt will be made.
    pub will_retry: bool,
    /// Delay before the next attempt, if backoff applies.
    pub next_delay: Option<Duration>,
    /// Total elapsed time since the first attempt.
    pub elapsed: Duration,
}

/// Runs zero-argument async operations under a [`RetryPolicy`].
///
/// The operation is a factory: every attempt calls it again to get a fresh
/// future. It must be safe to invoke more than once; the runner gives no
/// exactly-once guarantee.
///
/// # Example
///
/// ```rust
/// use chordjob::{RetryPolicy, RetryRunner};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # tokio_test::block_on(async {
/// let calls = AtomicU32::new(0);
/// let runner = RetryRunner::new(RetryPolicy::new(3));
///
/// let value = runner
///     .run(|| async {
///         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///             Err("rate limited")
///         } else {
///             Ok(42)
///         }
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(value, 42);
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # });
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryRunner {
    policy: RetryPolicy,
}

impl RetryRunner {
    /// Create a runner for `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy this runner applies.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Each failure is logged at `warn`; exhaustion is logged at `error` and
    /// returned with the last error untouched.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run_inner(operation, |_: &E| true, |_: &RetryEvent<'_, E>| {})
            .await
    }

    /// Retry only while `should_retry` accepts the error.
    ///
    /// A rejected error stops the loop at once; the returned
    /// [`RetryExhausted`] reports the attempts actually made. Timeouts are
    /// always considered retryable.
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        operation: F,
        should_retry: P,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        self.run_inner(operation, should_retry, |_: &RetryEvent<'_, E>| {})
            .await
    }

    /// Like [`run`](Self::run), calling `on_retry` after every failed attempt.
    ///
    /// The hook is synchronous and should not block; use it for metrics or
    /// extra bookkeeping.
    pub async fn run_with_hooks<T, E, F, Fut, H>(
        &self,
        operation: F,
        on_retry: H,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        H: Fn(&RetryEvent<'_, E>),
    {
        self.run_inner(operation, |_: &E| true, on_retry).await
    }

    async fn run_inner<T, E, F, Fut, P, H>(
        &self,
        mut operation: F,
        should_retry: P,
        on_retry: H,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
        H: Fn(&RetryEvent<'_, E>),
    {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1u32;

        loop {
            let outcome = match self.policy.timeout() {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(result) => result.map_err(AttemptError::Failed),
                    Err(_) => Err(AttemptError::TimedOut { duration: limit }),
                },
                None => operation().await.map_err(AttemptError::Failed),
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let retryable = match &error {
                AttemptError::Failed(e) => should_retry(e),
                AttemptError::TimedOut { .. } => true,
            };
            let will_retry = retryable && attempt < max_attempts;
            let next_delay = if will_retry {
                self.policy.jittered_delay(attempt)
            } else {
                None
            };

            on_retry(&RetryEvent {
                attempt,
                error: &error,
                will_retry,
                next_delay,
                elapsed: start.elapsed(),
            });

            if !will_retry {
                tracing::error!(
                    attempts = attempt,
                    max_attempts,
                    error = %error,
                    "giving up on operation"
                );
                return Err(RetryExhausted::new(error, attempt, start.elapsed()));
            }

            tracing::warn!(attempt, max_attempts, error = %error, "attempt failed, retrying");

            if let Some(delay) = next_delay {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

/// Run `operation` under `policy`.
///
/// Shorthand for `RetryRunner::new(policy.clone()).run(operation)`.
pub async fn retry<T, E, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryRunner::new(policy.clone()).run(operation).await
}

//! A job wrapping a single retryable operation.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::job::{Job, JobError, JobState};
use crate::retry::{RetryPolicy, RetryRunner};

/// One async operation executed under one [`RetryPolicy`].
///
/// The operation is called again for every attempt, so anything it needs
/// (API client, storage handle, arguments) should be captured by the closure,
/// typically behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use chordjob::prelude::*;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let base = Arc::new(100u64);
/// let job = IndependentJob::new(
///     move || {
///         let base = Arc::clone(&base);
///         async move { Ok::<_, String>(*base + 1) }
///     },
///     RetryPolicy::default(),
/// );
///
/// assert_eq!(job.execute().await, Ok(101));
/// # });
/// ```
pub struct IndependentJob<F> {
    operation: F,
    runner: RetryRunner,
}

impl<F> IndependentJob<F> {
    /// Create a job running `operation` under `policy`.
    pub fn new<Fut, T, E>(operation: F, policy: RetryPolicy) -> Self
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        Self {
            operation,
            runner: RetryRunner::new(policy),
        }
    }

    /// The retry policy applied to the operation.
    pub fn policy(&self) -> &RetryPolicy {
        self.runner.policy()
    }
}

impl<F> fmt::Debug for IndependentJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndependentJob")
            .field("operation", &"<function>")
            .field("policy", self.runner.policy())
            .finish()
    }
}

impl<F, Fut, T, E> Job for IndependentJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: fmt::Display + Send,
{
    type Output = T;
    type Error = E;

    fn execute(&self) -> BoxFuture<'_, Result<T, JobError<E>>> {
        async move {
            tracing::debug!(state = %JobState::Pending, "job queued");
            tracing::debug!(state = %JobState::Running, "job started");

            let result = self
                .runner
                .run(|| (self.operation)())
                .await
                .map_err(JobError::Operation);

            tracing::debug!(state = %JobState::of(&result), "job finished");
            result
        }
        .boxed()
    }
}

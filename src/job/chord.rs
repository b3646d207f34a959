//! Fan-in job: run dependencies in order, then reduce their results.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::job::{BoxedJob, Job, JobError, JobState};
use crate::retry::{RetryPolicy, RetryRunner};

/// A job that waits on a list of dependency jobs and reduces their results.
///
/// Dependencies run **sequentially**, in declaration order: each one is
/// awaited before the next starts. This keeps the load on a rate-limited API
/// and on the database bounded, and guarantees the reducer sees results in
/// declaration order regardless of how long each dependency took.
///
/// Each dependency applies its own retry policy. The chord's policy applies
/// only to the reducer. If a dependency fails, the remaining dependencies are
/// never started and the reducer never runs.
///
/// A reducer retry re-runs the whole reducer with the same results, so a
/// reducer that persists data must tolerate being applied twice (upsert).
///
/// # Example
///
/// ```rust
/// use chordjob::prelude::*;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let chord = ChordJob::new(
///     vec![
///         IndependentJob::new(|| async { Ok::<_, String>("a") }, RetryPolicy::once()).boxed(),
///         IndependentJob::new(|| async { Ok::<_, String>("b") }, RetryPolicy::once()).boxed(),
///     ],
///     |results: Arc<[&'static str]>| async move { Ok::<_, String>(results.concat()) },
///     RetryPolicy::new(3),
/// );
///
/// assert_eq!(chord.execute().await, Ok("ab".to_string()));
/// # });
/// ```
pub struct ChordJob<T, E, F> {
    dependencies: Vec<BoxedJob<T, E>>,
    reducer: F,
    runner: RetryRunner,
}

impl<T, E, F> ChordJob<T, E, F> {
    /// Create a chord over `dependencies` with `reducer` retried under `policy`.
    pub fn new<Fut, R>(dependencies: Vec<BoxedJob<T, E>>, reducer: F, policy: RetryPolicy) -> Self
    where
        F: Fn(Arc<[T]>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        Self {
            dependencies,
            reducer,
            runner: RetryRunner::new(policy),
        }
    }

    /// Append a dependency after the existing ones.
    pub fn with_dependency(mut self, dependency: BoxedJob<T, E>) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns true if the chord has no dependencies.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// The retry policy applied to the reducer.
    pub fn policy(&self) -> &RetryPolicy {
        self.runner.policy()
    }
}

impl<T, E, F> fmt::Debug for ChordJob<T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChordJob")
            .field("dependencies", &self.dependencies.len())
            .field("reducer", &"<function>")
            .field("policy", self.runner.policy())
            .finish()
    }
}

impl<T, E, F, Fut, R> Job for ChordJob<T, E, F>
where
    T: Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn(Arc<[T]>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Send,
{
    type Output = R;
    type Error = E;

    fn execute(&self) -> BoxFuture<'_, Result<R, JobError<E>>> {
        async move {
            let total = self.dependencies.len();
            tracing::debug!(state = %JobState::Pending, dependencies = total, "chord queued");
            tracing::debug!(state = %JobState::Running, dependencies = total, "chord started");

            let mut results = Vec::with_capacity(total);
            for (index, dependency) in self.dependencies.iter().enumerate() {
                match dependency.execute().await {
                    Ok(value) => results.push(value),
                    Err(source) => {
                        tracing::error!(
                            state = %JobState::Failed,
                            index,
                            dependencies = total,
                            error = %source,
                            "dependency failed, stopping chord"
                        );
                        return Err(JobError::Dependency {
                            index,
                            source: Box::new(source),
                        });
                    }
                }
            }

            tracing::debug!(dependencies = total, "all dependencies succeeded, reducing");
            let results: Arc<[T]> = results.into();

            let result = self
                .runner
                .run(|| (self.reducer)(Arc::clone(&results)))
                .await
                .map_err(JobError::Reducer);

            tracing::debug!(state = %JobState::of(&result), "chord finished");
            result
        }
        .boxed()
    }
}

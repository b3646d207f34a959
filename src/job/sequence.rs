//! Ordered execution of jobs for their side effects.

use std::fmt;
use std::future::{ready, Ready};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::job::{BoxedJob, ChordJob, Job, JobError};
use crate::retry::RetryPolicy;

type Discard<T, E> = fn(Arc<[T]>) -> Ready<Result<(), E>>;

fn discard<T, E>(_results: Arc<[T]>) -> Ready<Result<(), E>> {
    ready(Ok(()))
}

/// Runs jobs one after another and discards their results.
///
/// This is a [`ChordJob`] whose reducer does nothing: ordering and fail-fast
/// behavior are identical, only the aggregation step is missing.
///
/// ```rust
/// use chordjob::prelude::*;
///
/// # tokio_test::block_on(async {
/// let sequence = JobSequence::new(vec![
///     IndependentJob::new(|| async { Ok::<_, String>(1) }, RetryPolicy::once()).boxed(),
///     IndependentJob::new(|| async { Ok::<_, String>(2) }, RetryPolicy::once()).boxed(),
/// ]);
///
/// assert_eq!(sequence.execute().await, Ok(()));
/// # });
/// ```
pub struct JobSequence<T, E> {
    chord: ChordJob<T, E, Discard<T, E>>,
}

impl<T, E> JobSequence<T, E> {
    /// Create a sequence running `jobs` in the given order.
    pub fn new(jobs: Vec<BoxedJob<T, E>>) -> Self {
        Self {
            chord: ChordJob::new(jobs, discard::<T, E> as Discard<T, E>, RetryPolicy::once()),
        }
    }

    /// Append a job after the existing ones.
    pub fn then(self, job: BoxedJob<T, E>) -> Self {
        Self {
            chord: self.chord.with_dependency(job),
        }
    }

    /// Number of jobs in the sequence.
    pub fn len(&self) -> usize {
        self.chord.len()
    }

    /// Returns true if the sequence holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.chord.is_empty()
    }
}

impl<T, E> fmt::Debug for JobSequence<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSequence")
            .field("jobs", &self.chord.len())
            .finish()
    }
}

impl<T, E> Job for JobSequence<T, E>
where
    T: Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
{
    type Output = ();
    type Error = E;

    fn execute(&self) -> BoxFuture<'_, Result<(), JobError<E>>> {
        self.chord.execute()
    }
}

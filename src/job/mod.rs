//! Jobs: units of retryable async work.
//!
//! A [`Job`] has a single capability, [`execute`](Job::execute), which
//! produces a result or fails with a [`JobError`]. Two building blocks
//! implement it:
//!
//! - [`IndependentJob`]: one operation under one [`RetryPolicy`](crate::RetryPolicy).
//! - [`ChordJob`]: an ordered list of dependency jobs executed one after
//!   another, followed by a reducer that receives all of their results.
//!
//! [`JobSequence`] is a chord without a reduction step, for running a list of
//! jobs in order purely for their side effects.
//!
//! # State machine
//!
//! Every `execute` call moves a job through `Pending → Running →
//! {Succeeded | Failed}`; transitions are emitted as `debug` tracing events
//! carrying a `state` field. A chord enters its reducer phase only after every
//! dependency succeeded, and fails the moment one of them fails.
//!
//! # Example
//!
//! ```rust
//! use chordjob::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let deps: Vec<BoxedJob<u32, String>> = (1..=3)
//!     .map(|n| {
//!         IndependentJob::new(move || async move { Ok::<_, String>(n * 10) }, RetryPolicy::default())
//!             .boxed()
//!     })
//!     .collect();
//!
//! let chord = ChordJob::new(
//!     deps,
//!     |results: Arc<[u32]>| async move { Ok::<_, String>(results.iter().sum::<u32>()) },
//!     RetryPolicy::default(),
//! );
//!
//! assert_eq!(chord.execute().await, Ok(60));
//! # });
//! ```

mod chord;
mod error;
mod independent;
mod sequence;

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::Instrument;

pub use chord::ChordJob;
pub use error::{FailureOrigin, JobError};
pub use independent::IndependentJob;
pub use sequence::JobSequence;

/// A unit of retryable async work.
///
/// Jobs keep no state between calls apart from their configuration, so
/// `execute` may be called more than once. Whether doing so is safe depends
/// on the operations inside being idempotent.
pub trait Job: Send + Sync {
    /// Value produced on success.
    type Output: Send;
    /// Error type of the underlying operations.
    type Error: Send;

    /// Run the job to completion.
    fn execute(&self) -> BoxFuture<'_, Result<Self::Output, JobError<Self::Error>>>;
}

/// A type-erased job, used to put different job types in one dependency list.
pub type BoxedJob<T, E> = Box<dyn Job<Output = T, Error = E>>;

impl<J: Job + ?Sized> Job for Box<J> {
    type Output = J::Output;
    type Error = J::Error;

    fn execute(&self) -> BoxFuture<'_, Result<Self::Output, JobError<Self::Error>>> {
        (**self).execute()
    }
}

impl<J: Job + ?Sized> Job for Arc<J> {
    type Output = J::Output;
    type Error = J::Error;

    fn execute(&self) -> BoxFuture<'_, Result<Self::Output, JobError<Self::Error>>> {
        (**self).execute()
    }
}

/// Lifecycle of a single `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Queued for execution, not started yet.
    Pending,
    /// Executing its operation, dependencies or reducer.
    Running,
    /// Finished with a value.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl JobState {
    /// The terminal state for a finished `execute` call.
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(_) => Self::Failed,
        }
    }
}

/// `state` values logged by events whose message contains `marker`, in order.
#[cfg(test)]
pub(crate) fn logged_states<'a>(lines: &[&'a str], marker: &str) -> Vec<&'a str> {
    lines
        .iter()
        .filter(|line| line.contains(marker))
        .filter_map(|line| {
            line.split_whitespace()
                .find_map(|field| field.strip_prefix("state="))
        })
        .collect()
}

/// Extension methods available on every [`Job`].
pub trait JobExt: Job + Sized {
    /// Erase the job's concrete type.
    fn boxed(self) -> BoxedJob<Self::Output, Self::Error>
    where
        Self: 'static,
    {
        Box::new(self)
    }

    /// Run the job inside an `info` span called `job` with the given name.
    ///
    /// ```rust
    /// use chordjob::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let job = IndependentJob::new(|| async { Ok::<_, String>(1) }, RetryPolicy::once())
    ///     .named("fetch-price-1");
    /// assert_eq!(job.name(), "fetch-price-1");
    /// assert_eq!(job.execute().await, Ok(1));
    /// # });
    /// ```
    fn named(self, name: impl Into<String>) -> Named<Self> {
        Named {
            inner: self,
            name: name.into(),
        }
    }
}

impl<J: Job> JobExt for J {}

/// A job wrapped in a tracing span. Created by [`JobExt::named`].
#[derive(Debug)]
pub struct Named<J> {
    inner: J,
    name: String,
}

impl<J> Named<J> {
    /// The span name given to this job.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unwrap the inner job.
    pub fn into_inner(self) -> J {
        self.inner
    }
}

impl<J: Job> Job for Named<J> {
    type Output = J::Output;
    type Error = J::Error;

    fn execute(&self) -> BoxFuture<'_, Result<Self::Output, JobError<Self::Error>>> {
        let span = tracing::info_span!("job", name = %self.name);
        self.inner.execute().instrument(span).boxed()
    }
}

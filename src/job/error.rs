//! Errors produced by executing jobs.

use std::fmt;

use crate::retry::{AttemptError, RetryExhausted};

/// Where in a job tree a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// An [`IndependentJob`](crate::IndependentJob)'s operation.
    Operation,
    /// A [`ChordJob`](crate::ChordJob)'s reducer.
    Reducer,
    /// The dependency at `index` of a chord failed; the reducer never ran.
    Dependency {
        /// Position of the failing dependency in declaration order.
        index: usize,
    },
}

/// Error returned by [`Job::execute`](crate::Job::execute).
///
/// Every variant ends, possibly after a chain of dependency failures, in the
/// [`RetryExhausted`] of the operation or reducer that gave up.
///
/// ```rust
/// use chordjob::prelude::*;
///
/// # tokio_test::block_on(async {
/// let chord = ChordJob::new(
///     vec![
///         IndependentJob::new(|| async { Ok::<_, String>(1) }, RetryPolicy::once()).boxed(),
///         IndependentJob::new(|| async { Err::<i32, _>("gone".to_string()) }, RetryPolicy::new(2))
///             .boxed(),
///     ],
///     |_results| async { Ok::<_, String>(()) },
///     RetryPolicy::once(),
/// );
///
/// let err = chord.execute().await.unwrap_err();
/// assert_eq!(err.origin(), FailureOrigin::Dependency { index: 1 });
/// assert_eq!(err.attempts(), 2);
/// assert_eq!(err.root_cause(), Some(&"gone".to_string()));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError<E> {
    /// The job's own operation failed on every attempt.
    Operation(RetryExhausted<E>),
    /// The chord's reducer failed on every attempt.
    Reducer(RetryExhausted<E>),
    /// A dependency failed, so later dependencies and the reducer were skipped.
    Dependency {
        /// Position of the failing dependency.
        index: usize,
        /// The dependency's own error.
        source: Box<JobError<E>>,
    },
}

impl<E> JobError<E> {
    /// Where this failure originated, at this level of the tree.
    pub fn origin(&self) -> FailureOrigin {
        match self {
            Self::Operation(_) => FailureOrigin::Operation,
            Self::Reducer(_) => FailureOrigin::Reducer,
            Self::Dependency { index, .. } => FailureOrigin::Dependency { index: *index },
        }
    }

    /// Returns true if a dependency failed rather than this job's own work.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, Self::Dependency { .. })
    }

    /// The innermost retry failure, following dependency chains.
    pub fn exhausted(&self) -> &RetryExhausted<E> {
        match self {
            Self::Operation(e) | Self::Reducer(e) => e,
            Self::Dependency { source, .. } => source.exhausted(),
        }
    }

    /// Attempts made by the operation or reducer that gave up.
    pub fn attempts(&self) -> u32 {
        self.exhausted().attempts
    }

    /// The last attempt's error of the operation or reducer that gave up.
    pub fn last_error(&self) -> &AttemptError<E> {
        &self.exhausted().last_error
    }

    /// The caller's own error at the bottom of the chain, unless it timed out.
    pub fn root_cause(&self) -> Option<&E> {
        self.last_error().as_failed()
    }

    /// Dependency indices from the root job down to the failing job.
    ///
    /// Empty when the failure was this job's own operation or reducer.
    pub fn dependency_path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = self;
        while let Self::Dependency { index, source } = current {
            path.push(*index);
            current = source;
        }
        path
    }

    /// Consume the error, returning the innermost [`RetryExhausted`].
    pub fn into_exhausted(self) -> RetryExhausted<E> {
        match self {
            Self::Operation(e) | Self::Reducer(e) => e,
            Self::Dependency { source, .. } => source.into_exhausted(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for JobError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(e) => write!(f, "operation failed: {}", e),
            Self::Reducer(e) => write!(f, "reducer failed: {}", e),
            Self::Dependency { index, source } => {
                write!(f, "dependency {} failed: {}", index, source)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for JobError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Operation(e) | Self::Reducer(e) => Some(e),
            Self::Dependency { source, .. } => Some(source.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exhausted(msg: &str, attempts: u32) -> RetryExhausted<String> {
        RetryExhausted::new(AttemptError::Failed(msg.to_string()), attempts, Duration::ZERO)
    }

    #[test]
    fn test_nested_dependency_chain() {
        let err = JobError::Dependency {
            index: 2,
            source: Box::new(JobError::Dependency {
                index: 0,
                source: Box::new(JobError::Operation(exhausted("rate limited", 5))),
            }),
        };

        assert_eq!(err.origin(), FailureOrigin::Dependency { index: 2 });
        assert!(err.is_dependency_failure());
        assert_eq!(err.dependency_path(), vec![2, 0]);
        assert_eq!(err.attempts(), 5);
        assert_eq!(err.root_cause(), Some(&"rate limited".to_string()));
        assert_eq!(
            err.to_string(),
            "dependency 2 failed: dependency 0 failed: operation failed: \
             retry exhausted after 5 attempts (0ns): rate limited"
        );
    }

    #[test]
    fn test_reducer_failure() {
        let err = JobError::Reducer(exhausted("db down", 3));

        assert_eq!(err.origin(), FailureOrigin::Reducer);
        assert!(!err.is_dependency_failure());
        assert!(err.dependency_path().is_empty());
        assert_eq!(err.into_exhausted().attempts, 3);
    }
}

//! Error types for retry operations.

use std::fmt;
use std::time::Duration;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError<E> {
    /// The operation returned an error.
    Failed(E),
    /// The attempt exceeded the policy's per-attempt timeout.
    TimedOut {
        /// The timeout that was exceeded.
        duration: Duration,
    },
}

impl<E> AttemptError<E> {
    /// Returns true if the attempt was cut off by the timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The operation's own error, if the attempt did not time out.
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::TimedOut { .. } => None,
        }
    }

    /// Consume and return the operation's own error, if any.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::TimedOut { .. } => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "{}", e),
            Self::TimedOut { duration } => write!(f, "attempt timed out after {:?}", duration),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AttemptError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failed(e) => Some(e),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Error returned when all attempts allowed by a policy have failed.
///
/// The last error is kept as-is so the underlying cause is never hidden.
///
/// # Examples
///
/// ```rust
/// use chordjob::{RetryPolicy, RetryRunner};
///
/// # tokio_test::block_on(async {
/// let runner = RetryRunner::new(RetryPolicy::new(2));
/// let exhausted = runner
///     .run(|| async { Err::<(), _>("always fails") })
///     .await
///     .unwrap_err();
///
/// assert_eq!(exhausted.attempts, 2);
/// assert_eq!(exhausted.into_source(), Some("always fails"));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// The error from the final attempt.
    pub last_error: AttemptError<E>,
    /// Total number of attempts made.
    pub attempts: u32,
    /// Time spent from the first attempt to the final failure.
    pub total_duration: Duration,
}

impl<E> RetryExhausted<E> {
    /// Create a new RetryExhausted error.
    pub fn new(last_error: AttemptError<E>, attempts: u32, total_duration: Duration) -> Self {
        Self {
            last_error,
            attempts,
            total_duration,
        }
    }

    /// Get a reference to the last attempt's error.
    pub fn last_error(&self) -> &AttemptError<E> {
        &self.last_error
    }

    /// Returns true if the final attempt timed out.
    pub fn timed_out(&self) -> bool {
        self.last_error.is_timeout()
    }

    /// Extract the operation's final error, discarding metadata.
    ///
    /// Returns `None` when the final attempt timed out instead of failing.
    pub fn into_source(self) -> Option<E> {
        self.last_error.into_failed()
    }
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retry exhausted after {} attempts ({:?}): {}",
            self.attempts, self.total_duration, self.last_error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryExhausted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.last_error {
            AttemptError::Failed(e) => Some(e),
            AttemptError::TimedOut { .. } => None,
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct RateLimited;

    impl fmt::Display for RateLimited {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "rate limited")
        }
    }

    impl std::error::Error for RateLimited {}

    #[test]
    fn test_retry_exhausted_display() {
        let err = RetryExhausted::new(
            AttemptError::Failed("connection failed"),
            3,
            Duration::from_millis(500),
        );
        let display = format!("{}", err);
        assert!(display.contains("retry exhausted"));
        assert!(display.contains("3 attempts"));
        assert!(display.contains("connection failed"));
    }

    #[test]
    fn test_timed_out_display_and_source() {
        let err: RetryExhausted<RateLimited> = RetryExhausted::new(
            AttemptError::TimedOut {
                duration: Duration::from_secs(2),
            },
            1,
            Duration::from_secs(2),
        );
        assert!(err.timed_out());
        assert!(format!("{}", err).contains("timed out after 2s"));
        assert!(err.source().is_none());
        assert!(err.into_source().is_none());
    }

    #[test]
    fn test_source_is_underlying_error() {
        let err = RetryExhausted::new(AttemptError::Failed(RateLimited), 5, Duration::ZERO);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "rate limited");
    }
}

//! Retry support for job operations.
//!
//! - **Pure data**: [`RetryPolicy`] only describes the attempt budget, an
//!   optional per-attempt timeout and an optional backoff.
//! - **One loop**: [`RetryRunner`] interprets the policy, logging each failed
//!   attempt and surfacing the last error once the budget is spent.
//!
//! # Quick Start
//!
//! ```rust
//! use chordjob::retry::{retry, RetryPolicy};
//!
//! # tokio_test::block_on(async {
//! let value = retry(|| async { Ok::<_, String>(7) }, &RetryPolicy::new(3))
//!     .await
//!     .unwrap();
//! assert_eq!(value, 7);
//! # });
//! ```
//!
//! # Timeouts
//!
//! [`RetryPolicy::with_timeout`] bounds each attempt, not the whole run. A
//! timed-out attempt is reported as [`AttemptError::TimedOut`] and retried.
//!
//! # Jitter Support
//!
//! Enable the `jitter` feature to randomize backoff delays:
//!
//! ```toml
//! chordjob = { version = "...", features = ["jitter"] }
//! ```

mod error;
mod policy;
mod runner;

pub use error::{AttemptError, RetryExhausted};
pub use policy::{Backoff, JitterStrategy, PolicyError, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use runner::{retry, RetryEvent, RetryRunner};

#[cfg(test)]
mod tests;

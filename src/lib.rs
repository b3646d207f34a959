//! # chordjob
//!
//! Retryable async jobs with sequential fan-in, used to pull NFT price and
//! wallet-asset snapshots from a marketplace API into a relational store.
//!
//! ## Building blocks
//!
//! - [`RetryRunner`] invokes an async operation until it succeeds or its
//!   [`RetryPolicy`] runs out of attempts, then surfaces the last error.
//! - [`IndependentJob`] is one operation under one policy.
//! - [`ChordJob`] runs its dependency jobs **one at a time, in declaration
//!   order**, then hands every result to a reducer that is itself retried.
//!   The first failing dependency stops the chord: later dependencies and the
//!   reducer never run.
//! - [`JobSequence`] is a chord without a reduction step.
//! - [`pipeline`] builds job trees for the marketplace ETL on top of injected
//!   [`MarketClient`](pipeline::MarketClient) and
//!   [`SnapshotStore`](pipeline::SnapshotStore) implementations.
//!
//! ## Quick Example
//!
//! ```rust
//! use chordjob::prelude::*;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let calls = Arc::new(AtomicU32::new(0));
//! let flaky = IndependentJob::new(
//!     {
//!         let calls = calls.clone();
//!         move || {
//!             let n = calls.fetch_add(1, Ordering::SeqCst);
//!             async move {
//!                 if n < 2 {
//!                     Err("rate limited".to_string())
//!                 } else {
//!                     Ok(42)
//!                 }
//!             }
//!         }
//!     },
//!     RetryPolicy::new(3),
//! );
//!
//! assert_eq!(flaky.execute().await, Ok(42));
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # });
//! ```
//!
//! ## Logging
//!
//! Every failed attempt is logged through [`tracing`] at `warn`, exhaustion at
//! `error`, job state transitions at `debug`. The crate never installs a
//! subscriber; that is up to the binary.
//!
//! ## Features
//!
//! - `jitter`: randomized backoff delays (pulls in `rand`).
//! - `serde`: deserialize [`RetryPolicy`] from configuration.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod job;
pub mod pipeline;
pub mod retry;

// Re-exports
pub use job::{
    BoxedJob, ChordJob, FailureOrigin, IndependentJob, Job, JobError, JobExt, JobSequence,
    JobState, Named,
};
pub use retry::{
    AttemptError, Backoff, JitterStrategy, PolicyError, RetryEvent, RetryExhausted, RetryPolicy,
    RetryRunner,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::job::{
        BoxedJob, ChordJob, FailureOrigin, IndependentJob, Job, JobError, JobExt, JobSequence,
    };
    pub use crate::retry::{AttemptError, Backoff, RetryExhausted, RetryPolicy, RetryRunner};
}

//! Job trees for the marketplace ETL.
//!
//! The factories here build one job per unit of external work: one
//! [`IndependentJob`](crate::IndependentJob) per proto price or per wallet,
//! gathered into a [`ChordJob`](crate::ChordJob) or
//! [`JobSequence`](crate::JobSequence). The marketplace API and the snapshot
//! store are injected through the [`MarketClient`] and [`SnapshotStore`]
//! traits and shared between jobs as `Arc`s.
//!
//! # Example
//!
//! ```rust,ignore
//! use chordjob::pipeline::{fetch_proto_range_price_job, FetchOptions, ProtoRange};
//! use chordjob::Job;
//! use std::sync::Arc;
//!
//! let job = fetch_proto_range_price_job(
//!     Arc::new(api_client),
//!     Arc::new(store),
//!     ProtoRange::from_bounds(args.from, args.to),
//!     chrono::Utc::now().date_naive(),
//!     &FetchOptions::default(),
//! );
//! let stored = job.execute().await?;
//! ```

mod group;
mod jobs;
mod model;
mod ports;

pub use group::group_by_proto_quality;
pub use jobs::{
    fetch_proto_price_job, fetch_proto_range_price_job, fetch_wallet_assets_job,
    fetch_wallets_assets_job, FetchOptions,
};
pub use model::{Asset, ProtoId, ProtoPrice, ProtoRange, Wallet, DEFAULT_QUALITY, PROTO_MAX};
pub use ports::{EtlError, MarketClient, PipelineError, SnapshotStore};

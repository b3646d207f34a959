//! Collaborators the pipeline jobs call into.
//!
//! Implementations are injected as `Arc`s; jobs hold no global state.

use std::fmt;
use std::future::Future;

use chrono::NaiveDate;

use crate::pipeline::model::{Asset, ProtoId, ProtoPrice, Wallet};

/// Read access to the marketplace API.
pub trait MarketClient: Send + Sync {
    /// Error raised by API calls.
    type Error: fmt::Display + Send + 'static;

    /// Lowest active sell order for `proto` at `quality`, in wei.
    ///
    /// `Ok(None)` means the request worked but nobody is selling.
    fn best_sell_price(
        &self,
        proto: ProtoId,
        quality: &str,
    ) -> impl Future<Output = Result<Option<u128>, Self::Error>> + Send;

    /// Every asset currently held by `wallet`. Paging is the client's concern.
    fn wallet_assets(
        &self,
        wallet: &Wallet,
    ) -> impl Future<Output = Result<Vec<Asset>, Self::Error>> + Send;
}

/// Write access to the snapshot store.
///
/// Both writes are retried as a whole on failure, so they must be upserts:
/// applying the same snapshot twice leaves the same state as applying it once.
pub trait SnapshotStore: Send + Sync {
    /// Error raised by storage calls.
    type Error: fmt::Display + Send + 'static;

    /// Store `prices` as the snapshot for `date`, returning rows written.
    fn upsert_prices(
        &self,
        date: NaiveDate,
        prices: &[ProtoPrice],
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Store `assets` as `wallet`'s holdings on `date`, returning rows written.
    fn save_assets(
        &self,
        date: NaiveDate,
        wallet: &Wallet,
        assets: &[Asset],
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;
}

/// Error of a pipeline job: either side may fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError<M, S> {
    /// The marketplace API call failed.
    Market(M),
    /// The storage call failed.
    Storage(S),
}

impl<M: fmt::Display, S: fmt::Display> fmt::Display for PipelineError<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market(e) => write!(f, "marketplace request failed: {}", e),
            Self::Storage(e) => write!(f, "storage write failed: {}", e),
        }
    }
}

impl<M, S> std::error::Error for PipelineError<M, S>
where
    M: std::error::Error + 'static,
    S: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Market(e) => Some(e),
            Self::Storage(e) => Some(e),
        }
    }
}

/// The error type of jobs built from client `C` and store `S`.
pub type EtlError<C, S> =
    PipelineError<<C as MarketClient>::Error, <S as SnapshotStore>::Error>;

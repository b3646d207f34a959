//! Factories building job trees for the fetch commands.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::job::{BoxedJob, ChordJob, IndependentJob, Job, JobExt, JobSequence};
use crate::pipeline::model::{ProtoId, ProtoPrice, ProtoRange, Wallet, DEFAULT_QUALITY};
use crate::pipeline::ports::{EtlError, MarketClient, SnapshotStore};
use crate::retry::RetryPolicy;

/// Settings shared by every job a factory builds.
///
/// With the `serde` feature this deserializes from e.g.
/// `{ "policy": { "max_attempts": 3 }, "quality": "Gold" }`; missing fields
/// fall back to [`FetchOptions::default`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FetchOptions {
    /// Policy for every fetch, and for the reducer of chords.
    pub policy: RetryPolicy,
    /// Quality used for price lookups.
    pub quality: String,
}

impl Default for FetchOptions {
    /// Five immediate attempts per job, `Meteorite` quality.
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            quality: DEFAULT_QUALITY.to_string(),
        }
    }
}

impl FetchOptions {
    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the lookup quality.
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }
}

/// Fetch the best sell price of one proto.
///
/// A proto without sell orders is priced at `0`. The job only reads from the
/// market; `S` fixes its error type so it can sit in a chord next to jobs that
/// write to the store.
pub fn fetch_proto_price_job<C, S>(
    client: Arc<C>,
    proto: ProtoId,
    options: &FetchOptions,
) -> BoxedJob<ProtoPrice, EtlError<C, S>>
where
    C: MarketClient + 'static,
    S: SnapshotStore + 'static,
{
    let quality = options.quality.clone();
    IndependentJob::new(
        move || {
            let client = Arc::clone(&client);
            let quality = quality.clone();
            async move {
                tracing::debug!(proto, quality = %quality, "fetching price");
                let price = client
                    .best_sell_price(proto, &quality)
                    .await
                    .map_err(EtlError::<C, S>::Market)?;
                if price.is_none() {
                    tracing::warn!(proto, quality = %quality, "no sell orders");
                }
                Ok::<_, EtlError<C, S>>(ProtoPrice {
                    proto,
                    price_wei: price.unwrap_or(0),
                })
            }
        },
        options.policy.clone(),
    )
    .named(format!("fetch-price-{}", proto))
    .boxed()
}

/// Fetch prices for every proto in `range`, one after another, then upsert
/// them as the snapshot for `date`.
///
/// Resolves to the number of rows the store reports written. Any proto whose
/// fetch exhausts its retries fails the whole job before anything is stored.
pub fn fetch_proto_range_price_job<C, S>(
    client: Arc<C>,
    store: Arc<S>,
    range: ProtoRange,
    date: NaiveDate,
    options: &FetchOptions,
) -> impl Job<Output = usize, Error = EtlError<C, S>>
where
    C: MarketClient + 'static,
    S: SnapshotStore + 'static,
{
    let dependencies = range
        .iter()
        .map(|proto| fetch_proto_price_job::<C, S>(Arc::clone(&client), proto, options))
        .collect();

    ChordJob::new(
        dependencies,
        move |prices: Arc<[ProtoPrice]>| {
            let store = Arc::clone(&store);
            async move {
                let stored = store
                    .upsert_prices(date, &prices)
                    .await
                    .map_err(EtlError::<C, S>::Storage)?;
                tracing::info!(%date, fetched = prices.len(), stored, "price snapshot saved");
                Ok::<_, EtlError<C, S>>(stored)
            }
        },
        options.policy.clone(),
    )
    .named(format!("fetch-prices-{}-{}", range.from, range.to))
}

/// Fetch every asset held by `wallet` and save them as its holdings on `date`.
///
/// Fetch and save are retried together, so a failed write refetches.
pub fn fetch_wallet_assets_job<C, S>(
    client: Arc<C>,
    store: Arc<S>,
    wallet: Wallet,
    date: NaiveDate,
    options: &FetchOptions,
) -> BoxedJob<usize, EtlError<C, S>>
where
    C: MarketClient + 'static,
    S: SnapshotStore + 'static,
{
    let name = format!("fetch-assets-{}", wallet);
    IndependentJob::new(
        move || {
            let client = Arc::clone(&client);
            let store = Arc::clone(&store);
            let wallet = wallet.clone();
            async move {
                tracing::info!(wallet = %wallet, "fetching assets");
                let assets = client
                    .wallet_assets(&wallet)
                    .await
                    .map_err(EtlError::<C, S>::Market)?;
                let stored = store
                    .save_assets(date, &wallet, &assets)
                    .await
                    .map_err(EtlError::<C, S>::Storage)?;
                tracing::info!(wallet = %wallet, assets = assets.len(), stored, "assets saved");
                Ok::<_, EtlError<C, S>>(stored)
            }
        },
        options.policy.clone(),
    )
    .named(name)
    .boxed()
}

/// Fetch and save assets for each wallet in turn.
///
/// The first wallet that exhausts its retries stops the run; wallets before
/// it keep their saved snapshot.
pub fn fetch_wallets_assets_job<C, S>(
    client: Arc<C>,
    store: Arc<S>,
    wallets: Vec<Wallet>,
    date: NaiveDate,
    options: &FetchOptions,
) -> JobSequence<usize, EtlError<C, S>>
where
    C: MarketClient + 'static,
    S: SnapshotStore + 'static,
{
    JobSequence::new(
        wallets
            .into_iter()
            .map(|wallet| {
                fetch_wallet_assets_job(Arc::clone(&client), Arc::clone(&store), wallet, date, options)
            })
            .collect(),
    )
}

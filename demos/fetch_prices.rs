//! Fetch Prices Example
//!
//! Runs the price and asset ETL jobs against an in-memory marketplace that
//! rate-limits some requests, so retries and the chord's ordering show up in
//! the logs.
//!
//! Run with: RUST_LOG=debug cargo run --example fetch_prices

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Mutex;
use std::sync::Arc;

use chordjob::pipeline::{
    fetch_proto_range_price_job, fetch_wallets_assets_job, group_by_proto_quality, Asset,
    FetchOptions, MarketClient, ProtoId, ProtoPrice, ProtoRange, SnapshotStore, Wallet,
};
use chordjob::{Job, RetryPolicy};
use chrono::NaiveDate;

#[derive(Debug)]
struct RateLimited;

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "429 too many requests")
    }
}

/// Fails the first request for every proto divisible by 4.
#[derive(Default)]
struct DemoMarket {
    seen: Mutex<HashMap<ProtoId, u32>>,
}

impl MarketClient for DemoMarket {
    type Error = RateLimited;

    async fn best_sell_price(&self, proto: ProtoId, _quality: &str) -> Result<Option<u128>, RateLimited> {
        let tries = {
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            let tries = seen.entry(proto).or_insert(0);
            *tries += 1;
            *tries
        };
        tokio::time::sleep(std::time::Duration::from_millis((proto as u64 * 7) % 20)).await;

        if proto % 4 == 0 && tries == 1 {
            return Err(RateLimited);
        }
        Ok((proto % 5 != 0).then(|| proto as u128 * 1_000_000_000_000))
    }

    async fn wallet_assets(&self, wallet: &Wallet) -> Result<Vec<Asset>, RateLimited> {
        let assets = (1..=wallet.address.len() as ProtoId)
            .map(|i| Asset {
                token_id: format!("{}-{}", wallet, i),
                name: format!("Card {}", i % 3),
                proto: i % 3 + 1,
                quality: "Meteorite".to_string(),
            })
            .collect();
        Ok(assets)
    }
}

#[derive(Debug)]
struct Unreachable;

impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store unreachable")
    }
}

#[derive(Default)]
struct PrintStore {
    prices: Mutex<BTreeMap<ProtoId, u128>>,
}

impl SnapshotStore for PrintStore {
    type Error = Unreachable;

    async fn upsert_prices(&self, date: NaiveDate, prices: &[ProtoPrice]) -> Result<usize, Unreachable> {
        let mut stored = self.prices.lock().unwrap_or_else(|e| e.into_inner());
        for price in prices {
            stored.insert(price.proto, price.price_wei);
        }
        println!("{}: upserted {} prices", date, prices.len());
        Ok(prices.len())
    }

    async fn save_assets(&self, date: NaiveDate, wallet: &Wallet, assets: &[Asset]) -> Result<usize, Unreachable> {
        let groups = group_by_proto_quality(assets.to_vec());
        println!("{}: wallet {} holds {} assets in {} groups", date, wallet, assets.len(), groups.len());
        for ((proto, quality), group) in &groups {
            println!("    proto {:>3} {:<10} x{}", proto, quality, group.len());
        }
        Ok(assets.len())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let market = Arc::new(DemoMarket::default());
    let store = Arc::new(PrintStore::default());
    let date = NaiveDate::from_ymd_opt(2022, 5, 27).unwrap_or_default();
    let options = FetchOptions::default().with_policy(RetryPolicy::new(3));

    println!("=== fetch-prices --from 1 --to 21 ===");
    let prices = fetch_proto_range_price_job(
        market.clone(),
        store.clone(),
        ProtoRange::new(1, 21),
        date,
        &options,
    );
    match prices.execute().await {
        Ok(stored) => println!("stored {} prices", stored),
        Err(e) => println!("fetch-prices failed: {}", e),
    }

    let snapshot = store.prices.lock().unwrap_or_else(|e| e.into_inner()).clone();
    for (proto, price) in snapshot.iter().take(5) {
        println!("    proto {:>3}: {} wei", proto, price);
    }

    println!("\n=== fetch-assets 0xabc 0xdef01 ===");
    let assets = fetch_wallets_assets_job(
        market,
        store,
        vec![Wallet::new("0xabc"), Wallet::new("0xdef01")],
        date,
        &options,
    );
    if let Err(e) = assets.execute().await {
        println!("fetch-assets failed: {}", e);
    }
}

//! Test Helper Functions and Utilities
//!
//! Chain fixtures, in-memory stores and service contexts shared by the integration tests.

use chrono::{DateTime, TimeZone, Utc};
use minestat_core::{
    cache::BlockFact,
    config::{AppConfig, StoreConfig},
    node::NodeClient,
    payout::{HttpPayoutClient, PayoutSource},
    runtime::ServiceContext,
    store::SqliteStore,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

/// A fixed "now": 2026-10-14 14:30:00 UTC.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 14, 30, 0).single().unwrap_or_default()
}

/// Epoch seconds of midnight UTC on the day of [`test_now`].
#[must_use]
pub fn test_midnight() -> i64 {
    Utc.with_ymd_and_hms(2026, 10, 14, 0, 0, 0).single().map_or(0, |t| t.timestamp())
}

/// One block as the mock node will serve it.
#[derive(Debug, Clone)]
pub struct ChainBlock {
    pub height: u64,
    pub time: i64,
    /// `None` for a block whose first transaction is not a generation.
    pub reward: Option<(String, f64)>,
}

impl ChainBlock {
    #[must_use]
    pub fn reward(height: u64, time: i64, address: &str, coins: f64) -> Self {
        Self { height, time, reward: Some((address.to_string(), coins)) }
    }

    #[must_use]
    pub fn plain(height: u64, time: i64) -> Self {
        Self { height, time, reward: None }
    }

    #[must_use]
    pub fn hash(&self) -> String {
        format!("{:064x}", self.height)
    }

    #[must_use]
    pub fn txid(&self) -> String {
        format!("{:064x}", 1_000_000 + self.height)
    }

    /// Verbose `getrawtransaction` result for the block's first transaction.
    #[must_use]
    pub fn transaction(&self) -> Value {
        match &self.reward {
            Some((address, coins)) => json!({
                "txid": self.txid(),
                "vin": [{ "coinbase": "03a0bb0d", "sequence": 4_294_967_295_u64 }],
                "vout": [{
                    "value": coins,
                    "n": 0,
                    "scriptPubKey": { "address": address, "type": "witness_v0_keyhash" }
                }]
            }),
            None => json!({
                "txid": self.txid(),
                "vin": [{ "txid": format!("{:064x}", self.height + 7), "vout": 1 }],
                "vout": [{ "value": 0.5, "n": 0, "scriptPubKey": { "address": "spender" } }]
            }),
        }
    }

    /// The fact ingestion is expected to produce for this block.
    #[must_use]
    pub fn expected_fact(&self) -> BlockFact {
        match &self.reward {
            Some((address, coins)) => BlockFact {
                height: self.height,
                hash: self.hash(),
                epoch_time: self.time,
                miner_address: address.clone(),
                coins: *coins,
            },
            None => BlockFact::without_reward(self.height, self.hash(), self.time),
        }
    }
}

/// `count` blocks starting at height 0, one every `spacing` seconds from `first_time`.
/// Even heights pay `coins` to `address`; odd heights carry no reward.
#[must_use]
pub fn create_test_chain(
    count: u64,
    first_time: i64,
    spacing: i64,
    address: &str,
    coins: f64,
) -> Vec<ChainBlock> {
    (0..count)
        .map(|height| {
            #[allow(clippy::cast_possible_wrap)]
            let time = first_time + height as i64 * spacing;
            if height % 2 == 0 {
                ChainBlock::reward(height, time, address, coins)
            } else {
                ChainBlock::plain(height, time)
            }
        })
        .collect()
}

pub async fn create_memory_store() -> Arc<SqliteStore> {
    let config = StoreConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
        create_if_missing: true,
    };
    Arc::new(SqliteStore::connect(&config).await.unwrap_or_else(|e| panic!("memory store: {e}")))
}

/// Configuration tuned for small test chains.
#[must_use]
pub fn create_test_config(history_depth: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.ingestion.history_depth = history_depth;
    config.ingestion.tip_safety_margin = 1;
    config.ingestion.progress_every = 2;
    config.node.timeout_seconds = 2;
    config.payout.timeout_seconds = 2;
    config
}

/// A context wired to a real [`NodeClient`] against `node_url` and an in-memory store.
pub async fn create_test_context(
    config: AppConfig,
    node_url: &str,
    payout_base_url: Option<&str>,
) -> Arc<ServiceContext> {
    let node = NodeClient::with_endpoint(node_url, "user", "pass", Duration::from_secs(2))
        .unwrap_or_else(|e| panic!("node client: {e}"));

    let payouts: Option<Arc<dyn PayoutSource>> = payout_base_url.map(|url| {
        let client = HttpPayoutClient::new(url, Duration::from_secs(2))
            .unwrap_or_else(|e| panic!("payout client: {e}"));
        Arc::new(client) as Arc<dyn PayoutSource>
    });

    Arc::new(ServiceContext::new(config, Arc::new(node), create_memory_store().await, payouts))
}

/// Ten-minute blocks from two days before [`test_midnight`] up to [`test_now`].
///
/// Every fourth block pays `miner-a`, the rest pay `miner-b`, all at 3.125 coins.
/// Block times sit 7 seconds past each ten-minute mark so none lands on a bucket edge.
#[must_use]
pub fn create_recent_chain() -> Vec<ChainBlock> {
    let first_time = test_midnight() - 2 * 86_400 + 7;
    let now = test_now().timestamp();

    (0u64..)
        .map(|height| {
            #[allow(clippy::cast_possible_wrap)]
            let time = first_time + height as i64 * 600;
            let address = if height % 4 == 0 { "miner-a" } else { "miner-b" };
            ChainBlock::reward(height, time, address, 3.125)
        })
        .take_while(|block| block.time < now)
        .collect()
}

/// Reference sum over `chain` for blocks strictly inside `(start, start + length)`.
/// `address = None` sums every miner.
#[must_use]
pub fn expected_coins(chain: &[ChainBlock], start: i64, length: i64, address: Option<&str>) -> f64 {
    chain
        .iter()
        .filter(|block| block.time > start && block.time < start + length)
        .filter_map(|block| block.reward.as_ref())
        .filter(|(miner, _)| address.is_none_or(|wanted| wanted == miner))
        .map(|(_, coins)| coins)
        .sum()
}

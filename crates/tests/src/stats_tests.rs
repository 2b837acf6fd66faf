//! Integration tests for stats aggregation over a populated cache.
//!
//! The cache holds two and a half days of ten-minute blocks and every request uses a
//! fixed clock, so each bucket can be checked against a reference sum over the fixture.

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::cast_possible_wrap)]

use crate::mock_infrastructure::{
    create_recent_chain, create_test_config, create_test_context, expected_coins, test_midnight,
    test_now, ChainBlock, NodeMockBuilder,
};
use minestat_core::{
    runtime::ServiceContext,
    stats::{win_percent, MiningStatsRequest},
};
use std::sync::Arc;

const DAY: i64 = 86_400;
const HOUR: i64 = 3_600;

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

fn request(addresses: &str, num_days: i64) -> MiningStatsRequest {
    MiningStatsRequest { addresses: addresses.to_string(), num_days }
}

async fn create_populated_context(node: &NodeMockBuilder) -> (Arc<ServiceContext>, Vec<ChainBlock>) {
    let chain = create_recent_chain();
    let context = create_test_context(create_test_config(1_000), &node.url(), None).await;
    context.cache().put_batch(chain.iter().map(|block| block.expected_fact()));
    (context, chain)
}

#[tokio::test]
async fn test_hourly_buckets_cover_today_so_far() {
    let node = NodeMockBuilder::new().await;
    let (context, chain) = create_populated_context(&node).await;
    let midnight = test_midnight();

    let response = context.aggregator().mining_stats(&request("miner-a", 2), test_now()).await;
    assert_eq!(response.hourly_stats.len(), 15);

    for (index, bucket) in response.hourly_stats.iter().enumerate() {
        let start = midnight + index as i64 * HOUR;
        let mine = expected_coins(&chain, start, HOUR, Some("miner-a"));
        let total = expected_coins(&chain, start, HOUR, None);

        assert_eq!(bucket.hour as usize, index);
        assert_close(bucket.coins, mine);
        assert_close(bucket.chain_coins, total);
        assert_close(bucket.win_percent, win_percent(mine, total, 0.1));
    }

    // 14:00 to 14:30 holds three blocks.
    assert_close(response.hourly_stats[14].chain_coins, 3.0 * 3.125);
}

#[tokio::test]
async fn test_daily_buckets_and_labels() {
    let node = NodeMockBuilder::new().await;
    let (context, chain) = create_populated_context(&node).await;
    let midnight = test_midnight();

    let response = context.aggregator().mining_stats(&request("miner-b", 2), test_now()).await;
    let labels: Vec<_> = response.daily_stats.iter().map(|day| day.day.as_str()).collect();
    assert_eq!(labels, ["2026-10-12", "2026-10-13", "Today"]);

    for (offset, bucket) in response.daily_stats.iter().enumerate() {
        let start = midnight - (2 - offset as i64) * DAY;
        assert_close(bucket.coins, expected_coins(&chain, start, DAY, Some("miner-b")));
        assert_close(bucket.chain_coins, expected_coins(&chain, start, DAY, None));
    }

    // Full days hold 144 blocks, today holds 87 by 14:30.
    assert_close(response.daily_stats[1].chain_coins, 144.0 * 3.125);
    assert_close(response.daily_stats[2].chain_coins, 87.0 * 3.125);
}

#[tokio::test]
async fn test_num_days_is_clamped() {
    let node = NodeMockBuilder::new().await;
    let (context, _) = create_populated_context(&node).await;

    let too_few = context.aggregator().mining_stats(&request("", 0), test_now()).await;
    assert_eq!(too_few.daily_stats.len(), 3);

    let negative = context.aggregator().mining_stats(&request("", -5), test_now()).await;
    assert_eq!(negative.daily_stats.len(), 3);

    let too_many = context.aggregator().mining_stats(&request("", 400), test_now()).await;
    assert_eq!(too_many.daily_stats.len(), 22);
    assert_eq!(too_many.daily_stats.last().unwrap().day, "Today");
    assert_eq!(too_many.daily_stats[0].coins, 0.0);
}

#[tokio::test]
async fn test_projection_extrapolates_today() {
    let node = NodeMockBuilder::new().await;
    let (context, _) = create_populated_context(&node).await;

    let response = context.aggregator().mining_stats(&request("miner-a", 2), test_now()).await;
    let today = response.daily_stats.last().unwrap().coins;
    let seconds_today = test_now().timestamp() - test_midnight();

    assert!(today > 0.0);
    assert_close(response.projected_coins_today, today * 86_400.0 / (seconds_today as f64 + 1.0));
}

#[tokio::test]
async fn test_address_list_is_normalized() {
    let node = NodeMockBuilder::new().await;
    let (context, _) = create_populated_context(&node).await;

    let plain = context.aggregator().mining_stats(&request("miner-a", 2), test_now()).await;
    let messy =
        context.aggregator().mining_stats(&request(" miner-a ,miner-a,, ", 2), test_now()).await;

    assert_eq!(plain, messy);
}

#[tokio::test]
async fn test_two_addresses_sum_to_whole_chain() {
    let node = NodeMockBuilder::new().await;
    let (context, _) = create_populated_context(&node).await;

    let both = context.aggregator().mining_stats(&request("miner-a,miner-b", 2), test_now()).await;
    let today = both.daily_stats.last().unwrap();

    assert_close(today.coins, today.chain_coins);
    assert_close(today.win_percent, 100.0);
}

#[tokio::test]
async fn test_unknown_address_and_net_hash() {
    let node = NodeMockBuilder::new().await;
    let (context, _) = create_populated_context(&node).await;
    assert!(context.chain_state().set_network_hashrate(4.2e12));

    let response = context.aggregator().mining_stats(&request("nobody", 2), test_now()).await;

    assert!(response.daily_stats.iter().all(|day| day.coins == 0.0 && day.win_percent == 0.0));
    assert!(response.daily_stats.iter().all(|day| day.chain_coins > 0.0));
    assert_eq!(response.projected_coins_today, 0.0);
    assert_eq!(response.net_hash, 4.2e12);
}

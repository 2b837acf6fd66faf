//! Integration tests for ingestion passes against a mock node.
//!
//! These tests drive the real `NodeClient` over HTTP and a real `SQLite` store, and
//! verify:
//! - The planned range stops short of the tip by the safety margin
//! - Reward and non-reward blocks are classified into the expected facts
//! - A pass resumes after the highest stored height
//! - An unreachable node degrades the pass instead of failing it
//! - A per-height RPC error aborts the pass, keeps the committed prefix and still
//!   refreshes the hashrate
//! - A persistently malformed block reply is recorded and later passes move past it

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use crate::mock_infrastructure::{
    create_test_chain, create_test_config, create_test_context, NodeMockBuilder,
};
use minestat_core::{
    cache::BlockFact,
    ingest::{IngestError, IngestOutcome},
    node::NodeError,
    store::BlockStore,
};
use serde_json::json;

const FIRST_BLOCK_TIME: i64 = 1_791_900_000;

#[tokio::test]
async fn test_first_pass_ingests_up_to_safety_margin() {
    let chain = create_test_chain(6, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(5).mock_network_hashps(2.5e12).mock_chain(&chain[..5]);

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    let report = context.pipeline().run_once().await.unwrap();

    assert_eq!(report.outcome, IngestOutcome::Completed);
    assert_eq!(report.planned, 0..5);
    assert_eq!(report.ingested, 5);
    assert_eq!(report.node_height, Some(5));
    assert_eq!(report.store_height, Some(4));
    assert!(report.hashrate_refreshed);

    assert_eq!(context.cache().len(), 5);
    assert!(context.cache().get(5).is_none(), "tip must wait for the safety margin");
    for block in &chain[..5] {
        assert_eq!(*context.cache().get(block.height).unwrap(), block.expected_fact());
    }

    assert_eq!(context.store().count().await.unwrap(), 5);
    assert_eq!(context.store().highest_height().await.unwrap(), Some(4));
    assert_eq!(context.chain_state().network_hashrate(), 2.5e12);
    assert_eq!(context.chain_state().node_height(), Some(5));

    node.assert();
}

#[tokio::test]
async fn test_history_depth_bounds_first_pass() {
    let chain = create_test_chain(10, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(9).mock_network_hashps(1.0e12).mock_chain(&chain[6..9]);

    let context = create_test_context(create_test_config(3), &node.url(), None).await;
    let report = context.pipeline().run_once().await.unwrap();

    assert_eq!(report.planned, 6..9);
    assert_eq!(context.cache().bounds().map(|b| (b.lowest, b.highest)), Some((6, 8)));
}

#[tokio::test]
async fn test_bootstrap_resumes_after_stored_height() {
    let chain = create_test_chain(5, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(5).mock_network_hashps(1.0e12).mock_chain(&chain[3..5]);

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    for block in &chain[..3] {
        let stored = BlockFact { hash: format!("stored-{}", block.height), ..block.expected_fact() };
        context.store().upsert(&stored).await.unwrap();
    }

    let loaded = context.bootstrap().await.unwrap();
    assert_eq!(loaded, 3);

    assert_eq!(context.cache().len(), 5);
    assert_eq!(context.cache().get(0).unwrap().hash, "stored-0");
    assert_eq!(*context.cache().get(3).unwrap(), chain[3].expected_fact());
    assert_eq!(context.chain_state().store_height(), Some(4));

    node.assert();
}

#[tokio::test]
async fn test_unreachable_node_degrades_without_error() {
    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count_unavailable();

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    context.store().upsert(&BlockFact::without_reward(0, "h0", FIRST_BLOCK_TIME)).await.unwrap();
    context.store().upsert(&BlockFact::without_reward(1, "h1", FIRST_BLOCK_TIME + 600)).await.unwrap();

    let loaded = context.bootstrap().await.unwrap();
    assert_eq!(loaded, 2);

    let report = context.pipeline().run_once().await.unwrap();
    assert_eq!(report.outcome, IngestOutcome::Degraded);
    assert_eq!(report.ingested, 0);
    assert!(report.planned.is_empty());

    let health = context.health();
    assert!(health.ready);
    assert!(health.degraded);
    assert_eq!(health.cache_entries, 2);
    assert_eq!(health.node_height, None);
}

#[tokio::test]
async fn test_rpc_error_aborts_pass_and_keeps_prefix() {
    let chain = create_test_chain(5, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(5)
        .mock_network_hashps(3.0e12)
        .mock_chain(&chain[..2])
        .mock_block_hash_error(2, -8, "Block height out of range");

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    let err = context.pipeline().run_once().await.unwrap_err();

    match err {
        IngestError::Node { height, source: NodeError::Rpc { code, .. } } => {
            assert_eq!(height, 2);
            assert_eq!(code, -8);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(context.cache().len(), 2);
    assert_eq!(context.store().highest_height().await.unwrap(), Some(1));
    assert!(context.cache().get(2).is_none());
    assert_eq!(context.chain_state().network_hashrate(), 3.0e12);
}

#[tokio::test]
async fn test_malformed_block_reply_is_passed_over() {
    let chain = create_test_chain(8, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);
    let broken = &chain[2];

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(5)
        .mock_network_hashps(1.0e12)
        .mock_chain(&chain[..2])
        .mock_block_hash(broken.height, &broken.hash())
        .mock_block_malformed(&broken.hash(), 1)
        .mock_chain(&chain[3..5]);

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    let report = context.pipeline().run_once().await.unwrap();

    assert_eq!(report.outcome, IngestOutcome::Completed);
    assert_eq!(report.ingested, 5);
    assert!(report.hashrate_refreshed);

    let placeholder = context.cache().get(2).unwrap();
    assert!(!placeholder.is_reward());
    assert!(placeholder.hash.is_empty());
    assert_eq!(placeholder.epoch_time, chain[1].time);
    assert_eq!(*context.cache().get(3).unwrap(), chain[3].expected_fact());
    assert_eq!(context.store().highest_height().await.unwrap(), Some(4));

    // a node that has moved on only serves the new heights
    let mut next = NodeMockBuilder::new().await;
    next.mock_block_count(8).mock_network_hashps(1.0e12).mock_chain(&chain[5..8]);

    let resumed = create_test_context(create_test_config(100), &next.url(), None).await;
    for fact in context.store().load_all().await.unwrap() {
        resumed.store().upsert(&fact).await.unwrap();
    }

    let report = resumed.pipeline().run_once().await.unwrap();
    assert_eq!(report.outcome, IngestOutcome::Completed);
    assert_eq!(report.planned, 5..8);
    assert_eq!(report.ingested, 3);

    node.assert();
    next.assert();
}

#[tokio::test]
async fn test_malformed_reward_transaction_recorded_as_non_reward() {
    let chain = create_test_chain(1, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);
    let block = &chain[0];

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(1)
        .mock_network_hashps(1.0e12)
        .mock_block_hash(0, &block.hash())
        .mock_block(&block.hash(), block.time, &[block.txid().as_str()])
        .mock_raw_transaction(&block.txid(), &json!({ "vin": "not-a-list", "vout": 7 }));

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    let report = context.pipeline().run_once().await.unwrap();

    assert_eq!(report.outcome, IngestOutcome::Completed);
    let fact = context.cache().get(0).unwrap();
    assert!(!fact.is_reward());
    assert_eq!(fact.coins, 0.0);
    assert_eq!(fact.epoch_time, block.time);
}

#[tokio::test]
async fn test_caught_up_pass_is_a_no_op() {
    let chain = create_test_chain(3, FIRST_BLOCK_TIME, 600, "miner-a", 3.125);

    let mut node = NodeMockBuilder::new().await;
    node.mock_block_count(3).mock_network_hashps(1.0e12);

    let context = create_test_context(create_test_config(100), &node.url(), None).await;
    for block in &chain {
        context.store().upsert(&block.expected_fact()).await.unwrap();
    }

    let report = context.pipeline().run_once().await.unwrap();
    assert_eq!(report.outcome, IngestOutcome::Completed);
    assert_eq!(report.ingested, 0);
    assert!(report.planned.is_empty());
    assert_eq!(report.store_height, Some(2));
}

//! # Minestat Core
//!
//! Core library for the minestat block-reward statistics service.
//!
//! This crate provides the foundational components for:
//!
//! - **[`cache`]**: In-memory height-indexed block fact cache with tracked lowest/highest bounds.
//!
//! - **[`ingest`]**: Ingestion pipeline that walks missing heights from the node, classifies
//!   reward transactions and writes through to the durable store and the cache, plus the
//!   periodic refresher that drives it.
//!
//! - **[`stats`]**: Epoch range resolver and the statistics aggregator that builds hourly and
//!   daily buckets, win percent and the same-day projection.
//!
//! - **[`payout`]**: Per-address overlay of externally sourced payout events.
//!
//! - **[`node`]**: JSON-RPC client for the chain node.
//!
//! - **[`store`]**: Durable `SQLite` store that is the source of truth across restarts.
//!
//! - **[`chain`]**: Shared height counters and the network hashrate gauge.
//!
//! - **[`runtime`]**: The service context that owns every component above.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ServiceContext                        │
//! │  ┌──────────────────┐   ┌────────────────┐  ┌─────────────┐  │
//! │  │ PeriodicRefresher│──►│IngestionPipeline│ │   Metrics   │  │
//! │  └──────────────────┘   └───┬────────┬───┘  └─────────────┘  │
//! │                 NodeClient ◄┘        └► SqliteStore          │
//! │                              │                               │
//! │                        ┌─────▼──────┐   ┌──────────────┐     │
//! │                        │ BlockCache │◄──│StatsAggregator│    │
//! │                        └────────────┘   └──────┬───────┘     │
//! │                                         ┌──────▼──────┐      │
//! │                                         │PayoutOverlay│      │
//! │                                         └─────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the ingestion pipeline writes to the cache. Request handlers read it through the
//! aggregator and never hold a cache lock across an external call.

pub mod cache;
pub mod chain;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod node;
pub mod payout;
pub mod runtime;
pub mod stats;
pub mod store;

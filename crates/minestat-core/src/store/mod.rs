//! Durable block fact store.
//!
//! The store is the source of truth across restarts: the cache is rebuilt from
//! [`BlockStore::load_all`] at startup and every ingested fact is upserted before it is
//! published to the cache.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::cache::BlockFact;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write height {height}: {reason}")]
    Write { height: u64, reason: String },

    #[error("store read failed: {0}")]
    Read(String),

    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

/// Repository trait for block fact persistence.
///
/// Provides an abstraction layer so the ingestion pipeline can be tested against
/// failing or in-memory stores.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Highest stored height, or `None` for an empty store.
    async fn highest_height(&self) -> Result<Option<u64>, StoreError>;

    async fn lowest_height(&self) -> Result<Option<u64>, StoreError>;

    /// Every stored fact in ascending height order.
    async fn load_all(&self) -> Result<Vec<BlockFact>, StoreError>;

    /// Inserts the fact or replaces the one already stored for its height.
    async fn upsert(&self, fact: &BlockFact) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

//! Height-indexed block fact cache.
//!
//! The cache is bootstrapped from the durable store at startup, grows monotonically by
//! height and is discarded on exit. The durable store stays the source of truth across
//! restarts.

pub mod block_cache;
pub mod types;

pub use block_cache::BlockCache;
pub use types::{BlockFact, CacheStats, HeightBounds};

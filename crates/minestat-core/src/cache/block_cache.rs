use crate::cache::types::{BlockFact, CacheStats, HeightBounds};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, trace};

/// Sentinel for the lowest bound while the cache is empty.
const EMPTY_LOWEST: u64 = u64::MAX;

/// Authoritative in-memory map from height to [`BlockFact`].
///
/// Facts live in a sharded `DashMap`, so concurrent writes to distinct heights never
/// contend on a single lock and readers only lock the shard they touch. The lowest and
/// highest populated heights are tracked with atomics and only ever widen: the cache
/// grows monotonically and never evicts.
///
/// # Consistency
///
/// A `put` is visible to every `get` that starts after the `put` returns. There is no
/// snapshot isolation: a range scan running alongside an ingestion pass may observe any
/// prefix of that pass. Bounds are widened after the fact is inserted, so a height inside
/// `bounds()` is always readable.
pub struct BlockCache {
    facts: DashMap<u64, Arc<BlockFact>, RandomState>,
    lowest: AtomicU64,
    highest: AtomicU64,
}

impl BlockCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            facts: DashMap::with_hasher(RandomState::new()),
            lowest: AtomicU64::new(EMPTY_LOWEST),
            highest: AtomicU64::new(0),
        }
    }

    /// Returns the fact stored for `height`, if any.
    #[must_use]
    pub fn get(&self, height: u64) -> Option<Arc<BlockFact>> {
        self.facts.get(&height).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns only the block time stored for `height`.
    ///
    /// Cheaper than [`get`](Self::get) for bracket probing since nothing is cloned.
    #[inline]
    #[must_use]
    pub fn epoch_time(&self, height: u64) -> Option<i64> {
        self.facts.get(&height).map(|entry| entry.epoch_time)
    }

    /// Stores a fact under its height, replacing any previous fact for that height.
    ///
    /// Re-inserting an identical fact leaves the cache unchanged.
    pub fn put(&self, fact: BlockFact) {
        let height = fact.height;
        trace!(height, coins = fact.coins, "caching block fact");

        self.facts.insert(height, Arc::new(fact));
        self.widen_bounds(height, height);
    }

    /// Stores many facts at once. Used when bootstrapping from the durable store.
    pub fn put_batch(&self, facts: impl IntoIterator<Item = BlockFact>) {
        let mut min = EMPTY_LOWEST;
        let mut max = 0;
        let mut count = 0usize;

        for fact in facts {
            min = min.min(fact.height);
            max = max.max(fact.height);
            self.facts.insert(fact.height, Arc::new(fact));
            count += 1;
        }

        if count > 0 {
            self.widen_bounds(min, max);
            debug!(count, lowest = min, highest = max, "cached block fact batch");
        }
    }

    /// Returns the inclusive `(lowest, highest)` populated heights, or `None` while empty.
    #[must_use]
    pub fn bounds(&self) -> Option<HeightBounds> {
        let lowest = self.lowest.load(Ordering::Acquire);
        let highest = self.highest.load(Ordering::Acquire);

        (lowest <= highest).then_some(HeightBounds { lowest, highest })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats { entries: self.len(), bounds: self.bounds() }
    }

    fn widen_bounds(&self, lowest: u64, highest: u64) {
        // highest first: while populating an empty cache, readers see an empty range
        // until `lowest` also drops below the sentinel.
        self.highest.fetch_max(highest, Ordering::AcqRel);
        self.lowest.fetch_min(lowest, Ordering::AcqRel);
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}

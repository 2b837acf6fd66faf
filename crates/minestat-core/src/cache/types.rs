use serde::{Deserialize, Serialize};

/// Reward facts recorded for a single chain height.
///
/// Exactly one fact exists per height. A height whose first transaction is not a
/// generation transaction is still recorded, with `coins == 0.0` and an empty
/// `miner_address`, so the height counts as ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFact {
    pub height: u64,
    pub hash: String,
    /// Block time in seconds since the Unix epoch.
    pub epoch_time: i64,
    pub miner_address: String,
    pub coins: f64,
}

impl BlockFact {
    /// Creates a fact for a height that minted no coins.
    #[must_use]
    pub fn without_reward(height: u64, hash: impl Into<String>, epoch_time: i64) -> Self {
        Self { height, hash: hash.into(), epoch_time, miner_address: String::new(), coins: 0.0 }
    }

    /// Returns `true` if this height minted coins to a miner address.
    #[must_use]
    pub fn is_reward(&self) -> bool {
        self.coins > 0.0 && !self.miner_address.is_empty()
    }
}

/// Inclusive height bounds of the populated cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightBounds {
    pub lowest: u64,
    pub highest: u64,
}

impl HeightBounds {
    #[must_use]
    pub fn contains(&self, height: u64) -> bool {
        self.lowest <= height && height <= self.highest
    }

    /// Number of heights spanned by the bounds, including gaps.
    #[must_use]
    pub fn span(&self) -> u64 {
        self.highest.saturating_sub(self.lowest).saturating_add(1)
    }
}

/// Point-in-time cache statistics for the health endpoint and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bounds: Option<HeightBounds>,
}

//! Shared ingestion progress tracking.
//!
//! `ChainState` holds the counters that both the request path and the periodic
//! refresher touch: the last observed node height, the last durable store height,
//! the network hashrate gauge and the outcome of the last ingestion pass.

use arc_swap::ArcSwap;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::trace;

/// Heights and pass status published together so readers never see a torn pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestProgress {
    /// Height reported by the node on the last successful `getblockcount`.
    pub node_height: Option<u64>,
    /// Highest height committed to the durable store.
    pub store_height: Option<u64>,
    /// `true` when the last pass could not reach the node.
    pub degraded: bool,
    /// Unix timestamp (seconds) of the last completed pass, `0` if none completed yet.
    pub last_pass_at: u64,
}

/// Shared chain counters.
///
/// # Thread Safety
///
/// Reads are wait-free. Progress is published through `ArcSwap` with `rcu` so the
/// ingestion pipeline (the only writer) never blocks request handlers. The hashrate
/// gauge is an `f64` stored as raw bits in an atomic.
///
/// # Example
///
/// ```
/// use minestat_core::chain::ChainState;
///
/// let state = ChainState::new();
/// state.set_node_height(1_000);
/// state.set_store_height(Some(999));
///
/// let progress = state.progress();
/// assert_eq!(progress.node_height, Some(1_000));
/// assert_eq!(progress.store_height, Some(999));
/// ```
#[derive(Clone)]
pub struct ChainState {
    progress: Arc<ArcSwap<IngestProgress>>,
    network_hashrate_bits: Arc<AtomicU64>,
}

fn current_unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl ChainState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(ArcSwap::from_pointee(IngestProgress::default())),
            network_hashrate_bits: Arc::new(AtomicU64::new(0f64.to_bits())),
        }
    }

    /// Returns a consistent copy of all progress fields.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> IngestProgress {
        **self.progress.load()
    }

    #[inline]
    #[must_use]
    pub fn store_height(&self) -> Option<u64> {
        self.progress.load().store_height
    }

    #[inline]
    #[must_use]
    pub fn node_height(&self) -> Option<u64> {
        self.progress.load().node_height
    }

    /// Returns the last cached network hashrate, `0.0` until the first successful refresh.
    #[inline]
    #[must_use]
    pub fn network_hashrate(&self) -> f64 {
        f64::from_bits(self.network_hashrate_bits.load(Ordering::Acquire))
    }

    /// Seconds since the last completed ingestion pass, or `None` if none completed.
    #[must_use]
    pub fn last_pass_age_seconds(&self) -> Option<u64> {
        let last = self.progress.load().last_pass_at;
        (last > 0).then(|| current_unix_timestamp().saturating_sub(last))
    }

    pub fn set_node_height(&self, height: u64) {
        self.progress.rcu(|p| IngestProgress { node_height: Some(height), ..**p });
        trace!(height, "node height updated");
    }

    pub fn set_store_height(&self, height: Option<u64>) {
        self.progress.rcu(|p| IngestProgress { store_height: height, ..**p });
    }

    /// Records a pass that could not reach the node.
    pub fn mark_degraded(&self) {
        self.progress.rcu(|p| IngestProgress { degraded: true, ..**p });
    }

    /// Records a completed pass and clears the degraded flag.
    pub fn mark_pass_complete(&self) {
        let now = current_unix_timestamp();
        self.progress.rcu(|p| IngestProgress { degraded: false, last_pass_at: now, ..**p });
    }

    /// Replaces the hashrate gauge. Non-finite or negative readings are ignored.
    pub fn set_network_hashrate(&self, hashrate: f64) -> bool {
        if !hashrate.is_finite() || hashrate < 0.0 {
            return false;
        }
        self.network_hashrate_bits.store(hashrate.to_bits(), Ordering::Release);
        trace!(hashrate, "network hashrate updated");
        true
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

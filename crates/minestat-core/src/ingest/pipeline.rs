use crate::{
    cache::{BlockCache, BlockFact},
    chain::ChainState,
    config::IngestionConfig,
    metrics::{MetricsCollector, MetricsOutcome},
    node::{ChainSource, NodeError},
    store::{BlockStore, StoreError},
};
use std::{
    ops::Range,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("node request failed at height {height}: {source}")]
    Node {
        height: u64,
        #[source]
        source: NodeError,
    },
}

/// How an ingestion pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The planned range was fully walked.
    Completed,
    /// The node could not be reached; the cache was served as-is.
    Degraded,
    /// A store write or a node call failed mid-walk; the rest is retried next pass.
    /// The hashrate refresh is still attempted.
    Aborted,
}

impl MetricsOutcome for IngestOutcome {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Aborted => "aborted",
        }
    }
}

/// Summary of one non-aborted pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub node_height: Option<u64>,
    pub store_height: Option<u64>,
    /// Heights planned for this pass. Empty in degraded mode or when already caught up.
    pub planned: Range<u64>,
    pub ingested: u64,
    pub hashrate_refreshed: bool,
    pub elapsed: Duration,
}

/// Walks missing heights from the node into the durable store and the cache.
///
/// # Pass structure
///
/// ```text
/// store height ──┐
///                ├─▶ plan ─▶ for each height: fetch ─▶ upsert ─▶ cache.put
/// node height ───┘                                              │
///                                                    after walk ▼
///                                                   refresh network hashrate
/// ```
///
/// Each fact is committed to the store before it is published to the cache, so the
/// cache never holds a height the store lacks. A failed write or node call stops the
/// pass at that height; what was already committed stays visible.
///
/// A malformed `getblockhash` or `getblock` reply is not a failure: the height is
/// recorded as a non-reward fact with an empty hash, carrying the epoch time of the
/// height below it (or `0` when that height is not cached). The walk moves on.
pub struct IngestionPipeline {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn BlockStore>,
    cache: Arc<BlockCache>,
    chain_state: ChainState,
    metrics: Arc<MetricsCollector>,
    config: IngestionConfig,
    hashrate_window: u64,
    pass_lock: Mutex<()>,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn ChainSource>,
        store: Arc<dyn BlockStore>,
        cache: Arc<BlockCache>,
        chain_state: ChainState,
        metrics: Arc<MetricsCollector>,
        config: IngestionConfig,
        hashrate_window: u64,
    ) -> Self {
        Self {
            source,
            store,
            cache,
            chain_state,
            metrics,
            config,
            hashrate_window,
            pass_lock: Mutex::new(()),
        }
    }

    /// Computes the heights a pass should walk.
    ///
    /// The walk starts after the highest stored height but never further back than
    /// `history_depth` below the node tip, and stops `tip_safety_margin` heights short of
    /// one past the tip (a margin of `1` excludes the tip itself).
    #[must_use]
    pub fn plan(&self, store_height: Option<u64>, node_height: u64) -> Range<u64> {
        plan_range(&self.config, store_height, node_height)
    }

    /// Runs one ingestion pass.
    ///
    /// Calls are serialized: a pass started while another is running waits for it.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Node`] if the node fails or rejects a call at a height; nothing is
    ///   written for it
    /// - [`IngestError::Store`] if a write fails; the pass stops before caching that fact
    pub async fn run_once(&self) -> Result<IngestReport, IngestError> {
        let _guard = self.pass_lock.lock().await;
        let started = Instant::now();

        let store_height = match self.store.highest_height().await {
            Ok(height) => height,
            Err(e) => {
                warn!(error = %e, "store height unavailable, using last known height");
                self.chain_state.store_height()
            }
        };
        self.chain_state.set_store_height(store_height);

        let node_height = match self.source.block_count().await {
            Ok(height) => height,
            Err(e) => {
                warn!(
                    error = %e,
                    store_height = ?store_height,
                    transient = e.is_transient(),
                    "node unreachable, serving cached data this cycle"
                );
                self.chain_state.mark_degraded();
                let report = IngestReport {
                    outcome: IngestOutcome::Degraded,
                    node_height: None,
                    store_height,
                    planned: 0..0,
                    ingested: 0,
                    hashrate_refreshed: false,
                    elapsed: started.elapsed(),
                };
                self.record(&report);
                return Ok(report);
            }
        };
        self.chain_state.set_node_height(node_height);

        let planned = self.plan(store_height, node_height);
        if !planned.is_empty() {
            info!(
                node_height,
                from = planned.start,
                to = planned.end,
                "ingesting block facts"
            );
        }

        let mut ingested = 0u64;
        let mut committed = store_height;

        for height in planned.clone() {
            if let Err(e) = self.ingest_height(height).await {
                warn!(height, ingested, error = %e, "ingestion batch aborted");
                let hashrate_refreshed = self.refresh_hashrate().await;
                let report = IngestReport {
                    outcome: IngestOutcome::Aborted,
                    node_height: Some(node_height),
                    store_height: committed,
                    planned,
                    ingested,
                    hashrate_refreshed,
                    elapsed: started.elapsed(),
                };
                self.record(&report);
                return Err(e);
            }

            ingested += 1;
            committed = Some(height);

            if ingested % self.config.progress_every == 0 {
                info!(height, ingested, remaining = planned.end - height - 1, "ingestion progress");
            }
        }

        let hashrate_refreshed = self.refresh_hashrate().await;
        self.chain_state.mark_pass_complete();

        let report = IngestReport {
            outcome: IngestOutcome::Completed,
            node_height: Some(node_height),
            store_height: committed,
            planned,
            ingested,
            hashrate_refreshed,
            elapsed: started.elapsed(),
        };

        if ingested > 0 {
            info!(ingested, store_height = ?committed, elapsed_ms = report.elapsed.as_millis(), "ingestion pass complete");
        } else {
            debug!(node_height, "ingestion pass complete, already caught up");
        }

        self.record(&report);
        Ok(report)
    }

    async fn ingest_height(&self, height: u64) -> Result<(), IngestError> {
        let fact = match self.source.fetch_block_fact(height).await {
            Ok(fact) => fact,
            Err(NodeError::MalformedResponse(reason)) => {
                let epoch_time = height
                    .checked_sub(1)
                    .and_then(|below| self.cache.epoch_time(below))
                    .unwrap_or(0);
                warn!(
                    height,
                    epoch_time,
                    %reason,
                    "malformed block reply, recording as non-reward"
                );
                BlockFact::without_reward(height, "", epoch_time)
            }
            Err(source) => return Err(IngestError::Node { height, source }),
        };

        self.store.upsert(&fact).await?;
        self.cache.put(fact);
        self.chain_state.set_store_height(Some(height));
        Ok(())
    }

    /// Refreshes the hashrate gauge. Failures keep the previous value.
    async fn refresh_hashrate(&self) -> bool {
        match self.source.network_hashps(self.hashrate_window).await {
            Ok(hashrate) if self.chain_state.set_network_hashrate(hashrate) => {
                self.metrics.record_network_hashrate(hashrate);
                true
            }
            Ok(hashrate) => {
                warn!(hashrate, "ignoring invalid network hashrate");
                false
            }
            Err(e) => {
                warn!(error = %e, "network hashrate refresh failed, keeping previous value");
                false
            }
        }
    }

    fn record(&self, report: &IngestReport) {
        self.metrics.record_ingest_batch(&report.outcome, report.ingested, report.elapsed);
        self.metrics.record_heights(report.node_height, report.store_height);
        self.metrics.record_cache_entries(self.cache.len());
    }
}

fn plan_range(config: &IngestionConfig, store_height: Option<u64>, node_height: u64) -> Range<u64> {
    let after_store = store_height.map_or(0, |h| h.saturating_add(1));
    let history_floor = node_height.saturating_sub(config.history_depth);
    let start = after_store.max(history_floor);
    let end = node_height.saturating_add(1).saturating_sub(config.tip_safety_margin);

    start..end.max(start)
}

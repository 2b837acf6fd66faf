use super::RuntimeError;
use crate::{
    cache::BlockCache,
    chain::ChainState,
    config::AppConfig,
    ingest::{IngestionPipeline, PeriodicRefresher},
    metrics::MetricsCollector,
    node::{ChainSource, NodeClient},
    payout::{HttpPayoutClient, PayoutOverlay, PayoutSource},
    stats::{EpochRangeResolver, StatsAggregator},
    store::{BlockStore, SqliteStore},
};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Snapshot served by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub cache_entries: usize,
    pub lowest_height: Option<u64>,
    pub highest_height: Option<u64>,
    pub node_height: Option<u64>,
    pub store_height: Option<u64>,
    pub degraded: bool,
    pub last_ingest_age_seconds: Option<u64>,
    pub network_hashrate: f64,
}

/// The single owned context for the running service.
///
/// Holds every shared component and hands out `Arc`s to them. The block cache and the
/// chain counters live here instead of at module scope, so several contexts (one per
/// integration test, for example) can coexist in one process.
pub struct ServiceContext {
    config: AppConfig,
    cache: Arc<BlockCache>,
    chain_state: ChainState,
    store: Arc<dyn BlockStore>,
    pipeline: Arc<IngestionPipeline>,
    payouts: Arc<PayoutOverlay>,
    aggregator: Arc<StatsAggregator>,
    metrics: Arc<MetricsCollector>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_initiated: AtomicBool,
}

impl ServiceContext {
    /// Wires the components around explicit collaborators.
    #[must_use]
    pub fn new(
        config: AppConfig,
        source: Arc<dyn ChainSource>,
        store: Arc<dyn BlockStore>,
        payout_source: Option<Arc<dyn PayoutSource>>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let cache = Arc::new(BlockCache::new());
        let chain_state = ChainState::new();

        let pipeline = Arc::new(IngestionPipeline::new(
            source,
            store.clone(),
            cache.clone(),
            chain_state.clone(),
            metrics.clone(),
            config.ingestion.clone(),
            config.node.hashrate_window_blocks,
        ));

        let payouts = Arc::new(PayoutOverlay::new(payout_source, metrics.clone()));

        let aggregator = Arc::new(StatsAggregator::new(
            cache.clone(),
            payouts.clone(),
            chain_state.clone(),
            EpochRangeResolver::from_config(&config.resolver),
            config.stats.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            config,
            cache,
            chain_state,
            store,
            pipeline,
            payouts,
            aggregator,
            metrics,
            shutdown_tx,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// Connects the production collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::ConfigValidation`] if the configuration is invalid
    /// - [`RuntimeError::StoreUnavailable`] if the durable store cannot be opened
    /// - [`RuntimeError::Initialization`] if an HTTP client cannot be built
    pub async fn connect(config: AppConfig) -> Result<Self, RuntimeError> {
        config.validate().map_err(RuntimeError::ConfigValidation)?;

        let store = SqliteStore::connect(&config.store).await?;
        let node =
            NodeClient::new(&config).map_err(|e| RuntimeError::Initialization(e.to_string()))?;

        let payout_source: Option<Arc<dyn PayoutSource>> = if config.payout.enabled {
            let client = HttpPayoutClient::new(&config.payout.base_url, config.payout_timeout())
                .map_err(|e| RuntimeError::Initialization(e.to_string()))?;
            Some(Arc::new(client))
        } else {
            info!("payout overlay disabled");
            None
        };

        info!(node = %config.node_url(), "service components connected");
        Ok(Self::new(config, Arc::new(node), Arc::new(store), payout_source))
    }

    /// Loads the durable history into the cache, then runs one ingestion pass.
    ///
    /// Must complete before requests are served. Returns the number of facts loaded
    /// from the store. The ingestion pass is best effort: its failure is logged and the
    /// refresher retries it.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StoreUnavailable`] if the stored history cannot be read.
    pub async fn bootstrap(&self) -> Result<usize, RuntimeError> {
        let started = Instant::now();

        let facts = self.store.load_all().await?;
        let loaded = facts.len();
        let store_height = facts.last().map(|fact| fact.height);

        self.cache.put_batch(facts);
        self.chain_state.set_store_height(store_height);
        self.metrics.record_cache_entries(self.cache.len());

        info!(
            loaded,
            store_height = ?store_height,
            elapsed_ms = started.elapsed().as_millis(),
            "block cache loaded from store"
        );

        match self.pipeline.run_once().await {
            Ok(report) => {
                info!(
                    outcome = ?report.outcome,
                    ingested = report.ingested,
                    node_height = ?report.node_height,
                    "initial ingestion finished"
                );
            }
            Err(e) => warn!(error = %e, "initial ingestion failed, continuing with stored history"),
        }

        Ok(loaded)
    }

    /// Spawns the periodic refresher; it stops on [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn start_refresher(&self) -> JoinHandle<()> {
        PeriodicRefresher::new(self.pipeline.clone(), self.config.refresh_interval())
            .start_with_shutdown(self.shutdown_tx.subscribe())
    }

    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals every background task to stop. Idempotent.
    pub fn shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("shutdown already initiated");
            return;
        }

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!(error = %e, "no background task received the shutdown signal");
        }
        info!("service shutdown signalled");
    }

    /// Waits for a background task started by this context and logs how it ended.
    pub async fn join_task(name: &str, handle: JoinHandle<()>) {
        match handle.await {
            Ok(()) => debug!(task = name, "background task completed"),
            Err(e) if e.is_cancelled() => debug!(task = name, "background task cancelled"),
            Err(e) => error!(task = name, error = %e, "background task failed"),
        }
    }

    #[must_use]
    pub fn health(&self) -> HealthReport {
        let stats = self.cache.stats();
        let progress = self.chain_state.progress();

        HealthReport {
            ready: stats.entries > 0,
            cache_entries: stats.entries,
            lowest_height: stats.bounds.map(|b| b.lowest),
            highest_height: stats.bounds.map(|b| b.highest),
            node_height: progress.node_height,
            store_height: progress.store_height,
            degraded: progress.degraded,
            last_ingest_age_seconds: self.chain_state.last_pass_age_seconds(),
            network_hashrate: self.chain_state.network_hashrate(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    #[must_use]
    pub fn chain_state(&self) -> &ChainState {
        &self.chain_state
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<IngestionPipeline> {
        &self.pipeline
    }

    #[must_use]
    pub fn payouts(&self) -> &Arc<PayoutOverlay> {
        &self.payouts
    }

    #[must_use]
    pub fn aggregator(&self) -> &Arc<StatsAggregator> {
        &self.aggregator
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

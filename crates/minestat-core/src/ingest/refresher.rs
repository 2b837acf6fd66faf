use super::pipeline::IngestionPipeline;
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::{error, info};

/// Background loop that keeps the cache fresh.
///
/// Sleeps for the configured interval, runs one ingestion pass, and repeats until
/// shutdown. The sleep only starts after the previous pass returns, so passes never
/// overlap. There is no backoff: a failed pass is simply retried after the next sleep.
pub struct PeriodicRefresher {
    pipeline: Arc<IngestionPipeline>,
    interval: Duration,
}

impl PeriodicRefresher {
    #[must_use]
    pub fn new(pipeline: Arc<IngestionPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Spawns the refresher loop. It exits when `shutdown_rx` receives a value or its
    /// sender is dropped. A pass in progress is not interrupted by the sleep arm.
    pub fn start_with_shutdown(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let pipeline = self.pipeline.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "periodic refresher started");

            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        if let Err(e) = pipeline.run_once().await {
                            error!(error = %e, "ingestion pass failed, retrying next cycle");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("periodic refresher shutting down");
                        break;
                    }
                }
            }
        })
    }
}

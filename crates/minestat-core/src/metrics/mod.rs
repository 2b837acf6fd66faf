//! # Metrics
//!
//! Prometheus metrics recorded through the `metrics` facade.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `minestat_ingested_heights_total` | counter | |
//! | `minestat_ingest_batches_total` | counter | `outcome` |
//! | `minestat_ingest_batch_duration_seconds` | histogram | |
//! | `minestat_store_height` | gauge | |
//! | `minestat_node_height` | gauge | |
//! | `minestat_network_hashrate` | gauge | |
//! | `minestat_cache_entries` | gauge | |
//! | `minestat_stats_requests_total` | counter | |
//! | `minestat_stats_request_duration_seconds` | histogram | |
//! | `minestat_payout_refresh_total` | counter | `outcome` |
//!
//! All recording paths are lock-free; the rendered exposition is produced on demand by
//! the `/metrics` endpoint.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{sync::OnceLock, time::Duration};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to install primary Prometheus recorder, attempting fallback"
                );

                let recorder = PrometheusBuilder::new().build_recorder();
                tracing::warn!(
                    "Using fallback Prometheus recorder (install error: {e}) - metrics may not be globally visible"
                );
                recorder.handle()
            }
        })
        .clone()
}

/// Label values used for outcome-labelled counters.
pub trait MetricsOutcome {
    fn as_metric_str(&self) -> &'static str;
}

#[derive(Clone)]
pub struct MetricsCollector {
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    /// Returns a collector bound to the process-wide Prometheus recorder.
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: init_prometheus_recorder() }
    }

    /// Records one ingestion pass.
    pub fn record_ingest_batch(&self, outcome: &impl MetricsOutcome, heights: u64, elapsed: Duration) {
        counter!("minestat_ingest_batches_total", "outcome" => outcome.as_metric_str()).increment(1);
        counter!("minestat_ingested_heights_total").increment(heights);
        histogram!("minestat_ingest_batch_duration_seconds").record(elapsed.as_secs_f64());
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_heights(&self, node_height: Option<u64>, store_height: Option<u64>) {
        if let Some(height) = node_height {
            gauge!("minestat_node_height").set(height as f64);
        }
        if let Some(height) = store_height {
            gauge!("minestat_store_height").set(height as f64);
        }
    }

    pub fn record_network_hashrate(&self, hashrate: f64) {
        gauge!("minestat_network_hashrate").set(hashrate);
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_cache_entries(&self, entries: usize) {
        gauge!("minestat_cache_entries").set(entries as f64);
    }

    pub fn record_stats_request(&self, elapsed: Duration) {
        counter!("minestat_stats_requests_total").increment(1);
        histogram!("minestat_stats_request_duration_seconds").record(elapsed.as_secs_f64());
    }

    pub fn record_payout_refresh(&self, outcome: &impl MetricsOutcome) {
        counter!("minestat_payout_refresh_total", "outcome" => outcome.as_metric_str())
            .increment(1);
    }

    /// Renders the Prometheus text exposition.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

use super::{PayoutEvent, PayoutSource};
use crate::{
    metrics::{MetricsCollector, MetricsOutcome},
    stats::window::{start_of_hour, TimeWindow},
};
use ahash::RandomState;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, warn};

/// Payouts known for one address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayoutRecord {
    /// Coins credited per epoch second. Events sharing a timestamp are summed.
    pub payouts: BTreeMap<i64, f64>,
    /// Epoch seconds of the last successful refresh.
    pub last_refreshed: i64,
}

impl PayoutRecord {
    #[must_use]
    pub fn from_events(events: &[PayoutEvent], refreshed_at: i64) -> Self {
        let mut payouts = BTreeMap::new();
        for event in events {
            *payouts.entry(event.created_at).or_insert(0.0) += event.coins;
        }
        Self { payouts, last_refreshed: refreshed_at }
    }

    #[must_use]
    pub fn coins_in(&self, window: TimeWindow) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        self.payouts.range(window.start.saturating_add(1)..window.end).map(|(_, coins)| coins).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The record was refreshed during the current UTC hour.
    Fresh,
    Refreshed { payouts: usize },
    /// The source failed; any previous record is kept.
    Failed,
    /// No payout source is configured.
    Disabled,
}

impl MetricsOutcome for RefreshOutcome {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Refreshed { .. } => "refreshed",
            Self::Failed => "failed",
            Self::Disabled => "disabled",
        }
    }
}

/// Per-address payout cache refreshed at most once per UTC hour.
///
/// The records map is never locked across the source call: the staleness check and
/// the replacement are two separate map operations. Two requests racing on the same
/// stale address may both call the source; the later result wins.
pub struct PayoutOverlay {
    source: Option<Arc<dyn PayoutSource>>,
    records: DashMap<String, PayoutRecord, RandomState>,
    metrics: Arc<MetricsCollector>,
}

impl PayoutOverlay {
    #[must_use]
    pub fn new(source: Option<Arc<dyn PayoutSource>>, metrics: Arc<MetricsCollector>) -> Self {
        Self { source, records: DashMap::with_hasher(RandomState::new()), metrics }
    }

    /// An overlay that never fetches and contributes no coins.
    #[must_use]
    pub fn disabled(metrics: Arc<MetricsCollector>) -> Self {
        Self::new(None, metrics)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Refreshes `address` unless it was already refreshed in the current UTC hour.
    ///
    /// Failures are logged and reported in the outcome, never propagated.
    pub async fn refresh_if_stale(&self, address: &str, now: DateTime<Utc>) -> RefreshOutcome {
        let outcome = self.refresh_inner(address, now).await;
        self.metrics.record_payout_refresh(&outcome);
        outcome
    }

    async fn refresh_inner(&self, address: &str, now: DateTime<Utc>) -> RefreshOutcome {
        let Some(source) = self.source.as_ref() else {
            return RefreshOutcome::Disabled;
        };

        let hour_start = start_of_hour(now);
        let is_fresh = self
            .records
            .get(address)
            .is_some_and(|record| record.last_refreshed >= hour_start);

        if is_fresh {
            debug!(address, "payout record fresh, skipping fetch");
            return RefreshOutcome::Fresh;
        }

        match source.recent_payouts(address).await {
            Ok(events) => {
                let record = PayoutRecord::from_events(&events, now.timestamp());
                let payouts = record.payouts.len();
                self.records.insert(address.to_string(), record);
                debug!(address, payouts, "payout record refreshed");
                RefreshOutcome::Refreshed { payouts }
            }
            Err(e) => {
                warn!(address, error = %e, "payout refresh failed, keeping previous record");
                RefreshOutcome::Failed
            }
        }
    }

    /// Sum of payout coins inside `window` across `addresses`.
    pub fn coins_in_window<'a>(
        &self,
        addresses: impl IntoIterator<Item = &'a str>,
        window: TimeWindow,
    ) -> f64 {
        addresses
            .into_iter()
            .filter_map(|address| self.records.get(address).map(|record| record.coins_in(window)))
            .sum()
    }

    #[must_use]
    pub fn record(&self, address: &str) -> Option<PayoutRecord> {
        self.records.get(address).map(|record| record.clone())
    }

    /// Installs a record directly, bypassing the source.
    pub fn insert_record(&self, address: impl Into<String>, record: PayoutRecord) {
        self.records.insert(address.into(), record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

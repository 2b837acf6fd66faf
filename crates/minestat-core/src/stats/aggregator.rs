use super::{
    resolver::EpochRangeResolver,
    types::{AddressSet, DayStat, HourStat, MiningStatsRequest, MiningStatsResponse},
    window::{start_of_day, start_of_hour, TimeWindow, SECONDS_PER_DAY, SECONDS_PER_HOUR},
};
use crate::{cache::BlockCache, chain::ChainState, config::StatsConfig, payout::PayoutOverlay};
use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds mining statistics from the block cache and the payout overlay.
///
/// Every bucket sum resolves its window to a height range, then re-checks each fact
/// against the exact open window. The cache is read without a lock, so a request
/// running alongside an ingestion pass sees some prefix of that pass.
pub struct StatsAggregator {
    cache: Arc<BlockCache>,
    payouts: Arc<PayoutOverlay>,
    chain_state: ChainState,
    resolver: EpochRangeResolver,
    config: StatsConfig,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(
        cache: Arc<BlockCache>,
        payouts: Arc<PayoutOverlay>,
        chain_state: ChainState,
        resolver: EpochRangeResolver,
        config: StatsConfig,
    ) -> Self {
        Self { cache, payouts, chain_state, resolver, config }
    }

    /// Coins mined on chain inside `window` by `addresses`.
    #[must_use]
    pub fn chain_coins(&self, window: TimeWindow, addresses: &AddressSet) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        let Some(range) = self.resolver.resolve(&self.cache, window) else {
            return 0.0;
        };

        range
            .filter_map(|height| self.cache.get(height))
            .filter(|fact| window.contains(fact.epoch_time) && addresses.matches(&fact.miner_address))
            .map(|fact| fact.coins)
            .sum()
    }

    /// On-chain coins plus payout overlay coins inside `window`.
    ///
    /// The overlay only contributes for an explicit address set; the whole-chain total
    /// is chain-only.
    #[must_use]
    pub fn sum_coins(&self, window: TimeWindow, addresses: &AddressSet) -> f64 {
        self.chain_coins(window, addresses) + self.payouts.coins_in_window(addresses.iter(), window)
    }

    /// One bucket per UTC hour of today so far, oldest first. The last bucket is the
    /// current (partial) hour.
    #[must_use]
    pub fn hourly_stats(&self, addresses: &AddressSet, now: DateTime<Utc>) -> Vec<HourStat> {
        let current_hour = now.hour();
        let hour_start = start_of_hour(now);
        let everyone = AddressSet::all();

        (0..=current_hour)
            .map(|hour| {
                let start = hour_start - i64::from(current_hour - hour) * SECONDS_PER_HOUR;
                let window = TimeWindow::hour_starting_at(start);
                let coins = self.sum_coins(window, addresses);
                let chain_coins = self.sum_coins(window, &everyone);

                HourStat {
                    hour,
                    coins,
                    chain_coins,
                    win_percent: win_percent(coins, chain_coins, self.config.noise_floor),
                }
            })
            .collect()
    }

    /// One bucket per UTC day, `num_days` days back through today.
    ///
    /// `num_days` is clamped to the configured `[min_days, max_days]`, so the result
    /// always has `clamped + 1` buckets. The last one is labelled `"Today"`.
    #[must_use]
    pub fn daily_stats(
        &self,
        addresses: &AddressSet,
        num_days: i64,
        now: DateTime<Utc>,
    ) -> Vec<DayStat> {
        let num_days = self.clamp_days(num_days);
        let day_start = start_of_day(now);
        let everyone = AddressSet::all();

        (0..=num_days)
            .map(|offset| {
                let start = day_start - (num_days - offset) * SECONDS_PER_DAY;
                let window = TimeWindow::day_starting_at(start);
                let coins = self.sum_coins(window, addresses);
                let chain_coins = self.sum_coins(window, &everyone);

                let day = if offset == num_days {
                    "Today".to_string()
                } else {
                    DateTime::from_timestamp(start, 0)
                        .map(|date| date.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                };

                DayStat {
                    day,
                    coins,
                    chain_coins,
                    win_percent: win_percent(coins, chain_coins, self.config.noise_floor),
                }
            })
            .collect()
    }

    fn clamp_days(&self, num_days: i64) -> i64 {
        num_days.clamp(i64::from(self.config.min_days), i64::from(self.config.max_days))
    }

    /// Builds the full response for a request, refreshing stale payout records first.
    ///
    /// Payout failures are absorbed by the overlay; this never fails. With no cached
    /// data every bucket is zero.
    pub async fn mining_stats(
        &self,
        request: &MiningStatsRequest,
        now: DateTime<Utc>,
    ) -> MiningStatsResponse {
        let addresses = AddressSet::parse(&request.addresses, self.config.max_addresses);

        for address in addresses.iter() {
            self.payouts.refresh_if_stale(address, now).await;
        }

        let hourly_stats = self.hourly_stats(&addresses, now);
        let daily_stats = self.daily_stats(&addresses, request.num_days, now);

        let today_coins = daily_stats.last().map_or(0.0, |today| today.coins);
        let seconds_today = now.timestamp() - start_of_day(now);
        let projected_coins_today = projected_coins(today_coins, seconds_today);

        debug!(
            addresses = addresses.len(),
            hours = hourly_stats.len(),
            days = daily_stats.len(),
            "mining stats computed"
        );
        info!(addresses = %request.addresses, today_coins, projected_coins_today, "mining stats request");

        MiningStatsResponse {
            hourly_stats,
            daily_stats,
            projected_coins_today,
            net_hash: self.chain_state.network_hashrate(),
        }
    }
}

/// Share of `chain` mined by `mine`, in percent.
///
/// `0` unless both totals exceed `noise_floor`. Clamped to `100` since payout coins can
/// push `mine` above the on-chain total.
#[must_use]
pub fn win_percent(mine: f64, chain: f64, noise_floor: f64) -> f64 {
    if mine > noise_floor && chain > noise_floor {
        (mine * 100.0 / chain).min(100.0)
    } else {
        0.0
    }
}

/// Extrapolates today's coins to a full day. The `+ 1` keeps the first second of the
/// day finite.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn projected_coins(today_coins: f64, seconds_since_midnight: i64) -> f64 {
    today_coins * SECONDS_PER_DAY as f64 / (seconds_since_midnight.max(0) as f64 + 1.0)
}

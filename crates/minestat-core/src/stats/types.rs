use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Body of `POST /getminingstats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiningStatsRequest {
    /// Comma-separated receiving addresses. Empty means the whole chain.
    #[serde(default)]
    pub addresses: String,
    #[serde(default)]
    pub num_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HourStat {
    /// UTC hour of day, `0` for the first hour after midnight.
    pub hour: u32,
    pub coins: f64,
    pub chain_coins: f64,
    pub win_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DayStat {
    /// ISO date (`YYYY-MM-DD`), or `"Today"` for the current day.
    pub day: String,
    pub coins: f64,
    pub chain_coins: f64,
    pub win_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiningStatsResponse {
    pub hourly_stats: Vec<HourStat>,
    pub daily_stats: Vec<DayStat>,
    pub projected_coins_today: f64,
    pub net_hash: f64,
}

/// Set of receiving addresses a request is scoped to.
///
/// The empty set matches every miner address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    addresses: AHashSet<String>,
    ordered: Vec<String>,
}

impl AddressSet {
    /// The empty set, matching every address.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list. Entries are trimmed, empty entries and duplicates
    /// are dropped, and entries beyond `max_addresses` are ignored.
    #[must_use]
    pub fn parse(raw: &str, max_addresses: usize) -> Self {
        let mut set = Self::default();
        let mut dropped = 0usize;

        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            if set.addresses.contains(entry) {
                continue;
            }
            if set.ordered.len() >= max_addresses {
                dropped += 1;
                continue;
            }
            set.addresses.insert(entry.to_string());
            set.ordered.push(entry.to_string());
        }

        if dropped > 0 {
            warn!(dropped, max_addresses, "too many addresses in request, extra entries ignored");
        }

        set
    }

    /// `true` if the set is empty or contains `address`.
    #[inline]
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        self.addresses.is_empty() || self.addresses.contains(address)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Addresses in request order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

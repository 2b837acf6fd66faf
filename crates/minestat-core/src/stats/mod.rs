//! Mining statistics.
//!
//! ```text
//! MiningStatsRequest ─▶ AddressSet ─┐
//!                                   ▼
//!            TimeWindow ─▶ EpochRangeResolver ─▶ height range
//!                                                   │
//!                    BlockCache facts (re-filtered) ┤
//!                    PayoutOverlay entries ─────────┤
//!                                                   ▼
//!                               HourStat / DayStat buckets ─▶ MiningStatsResponse
//! ```

pub mod aggregator;
pub mod resolver;
pub mod types;
pub mod window;

pub use aggregator::{projected_coins, win_percent, StatsAggregator};
pub use resolver::EpochRangeResolver;
pub use types::{AddressSet, DayStat, HourStat, MiningStatsRequest, MiningStatsResponse};
pub use window::TimeWindow;

use chrono::{DateTime, Utc};

pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A wall-clock window in epoch seconds.
///
/// Membership is the open interval `start < t < end`, applied to cached block facts
/// and payout events alike. A timestamp exactly on a bucket edge therefore belongs to
/// neither neighbouring bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    #[inline]
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn hour_starting_at(start: i64) -> Self {
        Self::new(start, start + SECONDS_PER_HOUR)
    }

    #[must_use]
    pub const fn day_starting_at(start: i64) -> Self {
        Self::new(start, start + SECONDS_PER_DAY)
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, time: i64) -> bool {
        self.start < time && time < self.end
    }

    /// `true` when no timestamp can satisfy [`contains`](Self::contains).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start.saturating_add(1)
    }
}

/// Epoch seconds of the start of the UTC hour containing `now`.
#[must_use]
pub fn start_of_hour(now: DateTime<Utc>) -> i64 {
    let ts = now.timestamp();
    ts - ts.rem_euclid(SECONDS_PER_HOUR)
}

/// Epoch seconds of the UTC midnight starting the day containing `now`.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> i64 {
    let ts = now.timestamp();
    ts - ts.rem_euclid(SECONDS_PER_DAY)
}

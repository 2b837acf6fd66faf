use super::window::TimeWindow;
use crate::{cache::BlockCache, config::ResolverConfig};
use std::ops::RangeInclusive;

/// Maps a wall-clock window to a height range that contains every cached height whose
/// time falls inside it.
///
/// This is a bracket probe, not a search. From the low bound the candidate advances by
/// `advance_stride` until a probe lands past the window start; from the high bound it
/// retreats by the same stride until a probe lands before the window end. Each side
/// then takes a single corrective jump of `correction_stride` outward and the result is
/// clamped to the cache bounds.
///
/// A probe on a height missing from the cache counts as an overshoot. Since the
/// previous probe on each side was present and still outside the window, the returned
/// range contains every matching height as long as times increase with height. The
/// range is usually wider than necessary, so callers re-filter every fact against the
/// exact window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochRangeResolver {
    advance_stride: u64,
    correction_stride: u64,
}

impl EpochRangeResolver {
    /// Strides of zero are raised to one.
    #[must_use]
    pub fn new(advance_stride: u64, correction_stride: u64) -> Self {
        Self { advance_stride: advance_stride.max(1), correction_stride: correction_stride.max(1) }
    }

    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.advance_stride, config.correction_stride)
    }

    /// Resolves `window` against the cache's current contents.
    ///
    /// Returns `None` only for an empty cache. An empty window yields the full cache
    /// bounds; callers are expected to skip the scan for such windows.
    #[must_use]
    pub fn resolve(&self, cache: &BlockCache, window: TimeWindow) -> Option<RangeInclusive<u64>> {
        let bounds = cache.bounds()?;
        let (lo, hi) = (bounds.lowest, bounds.highest);

        if window.end <= window.start {
            return Some(lo..=hi);
        }

        let lower = self.lower_bound(cache, window.start, lo, hi);
        let upper = self.upper_bound(cache, window.end, lo, hi);

        Some(lower..=upper)
    }

    fn lower_bound(&self, cache: &BlockCache, start: i64, lo: u64, hi: u64) -> u64 {
        let mut candidate = lo;

        loop {
            let overshoot =
                candidate > hi || cache.epoch_time(candidate).is_none_or(|time| time > start);

            if overshoot {
                return candidate.saturating_sub(self.correction_stride).max(lo);
            }

            match candidate.checked_add(self.advance_stride) {
                Some(next) => candidate = next,
                None => return hi.saturating_sub(self.correction_stride).max(lo),
            }
        }
    }

    fn upper_bound(&self, cache: &BlockCache, end: i64, lo: u64, hi: u64) -> u64 {
        let mut candidate = hi;

        loop {
            let overshoot = cache.epoch_time(candidate).is_none_or(|time| time < end);

            if overshoot {
                return candidate.saturating_add(self.correction_stride).min(hi);
            }

            match candidate.checked_sub(self.advance_stride) {
                Some(next) if next >= lo => candidate = next,
                // the next probe would fall below the cache; jump from where it would land
                _ => {
                    return candidate
                        .saturating_add(self.correction_stride)
                        .saturating_sub(self.advance_stride)
                        .clamp(lo, hi);
                }
            }
        }
    }
}

impl Default for EpochRangeResolver {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

//! Interval counter bank.
//!
//! Eight counters record how often the daily change landed in each of four
//! "up" and four "down" half-open bins `(low, high]`. They only ever grow and
//! are zeroed by a take-profit.

use serde::{Deserialize, Serialize};

/// Half-open bin `(low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    pub low: f64,
    pub high: f64,
}

impl BinEdges {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        self.low < x && x <= self.high
    }
}

/// Default up bins on the daily change.
pub fn default_long_bins() -> [BinEdges; 4] {
    [
        BinEdges::new(0.01, 0.015),
        BinEdges::new(0.025, 0.035),
        BinEdges::new(0.045, 0.065),
        BinEdges::new(0.075, 0.1),
    ]
}

/// Default down bins on the daily change.
pub fn default_short_bins() -> [BinEdges; 4] {
    [
        BinEdges::new(-0.015, -0.01),
        BinEdges::new(-0.035, -0.025),
        BinEdges::new(-0.065, -0.045),
        BinEdges::new(-0.1, -0.075),
    ]
}

/// Per-bin occurrence counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalCounters {
    pub up: [u32; 4],
    pub down: [u32; 4],
}

impl IntervalCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `daily_pct` into every bin that contains it.
    ///
    /// Each bin is checked on its own; only its own counter moves.
    #[must_use]
    pub fn update(
        &self,
        daily_pct: f64,
        long_bins: &[BinEdges; 4],
        short_bins: &[BinEdges; 4],
    ) -> Self {
        let mut next = *self;
        for (count, bin) in next.up.iter_mut().zip(long_bins) {
            if bin.contains(daily_pct) {
                *count = count.saturating_add(1);
            }
        }
        for (count, bin) in next.down.iter_mut().zip(short_bins) {
            if bin.contains(daily_pct) {
                *count = count.saturating_add(1);
            }
        }
        next
    }

    /// True if any up counter exceeds its threshold.
    #[must_use]
    pub fn any_up_above(&self, thresholds: &[u32; 4]) -> bool {
        self.up.iter().zip(thresholds).any(|(c, t)| c > t)
    }

    /// True if any down counter exceeds its threshold.
    #[must_use]
    pub fn any_down_above(&self, thresholds: &[u32; 4]) -> bool {
        self.down.iter().zip(thresholds).any(|(c, t)| c > t)
    }
}

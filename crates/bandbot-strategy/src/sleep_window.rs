//! Inter-cycle pacing.
//!
//! The loop sleeps a duration drawn from `[start, end]` seconds. Big moves
//! shrink the window so the loop reacts quickly; quiet markets stretch it.

use serde::{Deserialize, Serialize};

use bandbot_core::{pct_change, Price};

pub const START_MIN: u64 = 2;
pub const START_MAX: u64 = 45;
pub const END_MIN: u64 = 4;
pub const END_MAX: u64 = 100;

/// Sleep window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepWindow {
    pub start: u64,
    pub end: u64,
}

impl Default for SleepWindow {
    fn default() -> Self {
        Self { start: 10, end: 20 }
    }
}

impl SleepWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }.normalized()
    }

    /// Clamp to the allowed ranges and order the bounds.
    #[must_use]
    pub fn normalized(self) -> Self {
        let start = self.start.clamp(START_MIN, START_MAX);
        let end = self.end.clamp(END_MIN, END_MAX);
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        (START_MIN..=START_MAX).contains(&self.start)
            && (END_MIN..=END_MAX).contains(&self.end)
            && self.start <= self.end
    }
}

/// Next window from the last cycle's move. `last == 0` is a no-op.
#[must_use]
pub fn modulate(window: SleepWindow, last: Price, current: Price) -> SleepWindow {
    let Some(r) = pct_change(last, current) else {
        return window;
    };
    let x = r.abs();
    let SleepWindow { start, end } = window;

    // A move landing exactly on 0.0005, 0.001 or 0.0015 leaves the window as is.
    let (start, end) = if x >= 0.01 {
        (START_MIN, END_MIN)
    } else if x > 0.0015 {
        (start.saturating_sub(45), end.saturating_sub(70))
    } else if x > 0.001 && x < 0.0015 {
        (start.saturating_sub(20), end.saturating_sub(45))
    } else if x > 0.0005 && x < 0.001 {
        (start + 1, end + 5)
    } else if x < 0.0005 {
        (start + 5, end + 20)
    } else {
        (start, end)
    };

    SleepWindow { start, end }.normalized()
}

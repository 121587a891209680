//! Band controller.
//!
//! A band is the daily-change interval `(down, up)` inside which opening a
//! position of that direction is allowed. The long band is compared against
//! the daily change, the short band against its negation.
//!
//! After a long open the *short* band is re-tuned from the realized cycle
//! move, and vice versa: a small move in our direction makes a reversal
//! likely, so the opposite band widens; a large move makes it unlikely, so
//! the opposite band narrows back toward its defaults. Separately, once one
//! side has opened often enough, its own band narrows to damp over-trading.
//!
//! Every bound is clamped to the rails `[down_default, ceiling]`.

use serde::{Deserialize, Serialize};

use bandbot_core::{pct_change, Price, Side};

const SMALL_MOVE: f64 = 0.0005;
const MODERATE_MOVE: f64 = 0.001;
const WIDE_STEP: f64 = 0.0005;
const FINE_STEP: f64 = 0.0002;

/// Configured defaults and safety rails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLimits {
    /// Default lower bound; also the floor of the rails.
    #[serde(default = "default_down")]
    pub down_default: f64,
    /// Default upper bound.
    #[serde(default = "default_up")]
    pub up_default: f64,
    /// Hard ceiling for every bound.
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,
    /// Lower bounds never rise above this through the frequency rule.
    #[serde(default = "default_frequency_down_cap")]
    pub frequency_down_cap: f64,
    /// Open count at which the frequency rule starts applying.
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: u32,
    /// Narrowing per open once the threshold is reached.
    #[serde(default = "default_frequency_step")]
    pub frequency_step: f64,
}

fn default_down() -> f64 {
    0.0015
}

fn default_up() -> f64 {
    0.0055
}

fn default_ceiling() -> f64 {
    0.0065
}

fn default_frequency_down_cap() -> f64 {
    0.0025
}

fn default_frequency_threshold() -> u32 {
    3
}

fn default_frequency_step() -> f64 {
    0.0001
}

impl Default for BandLimits {
    fn default() -> Self {
        Self {
            down_default: default_down(),
            up_default: default_up(),
            ceiling: default_ceiling(),
            frequency_down_cap: default_frequency_down_cap(),
            frequency_threshold: default_frequency_threshold(),
            frequency_step: default_frequency_step(),
        }
    }
}

impl BandLimits {
    #[inline]
    pub fn floor(&self) -> f64 {
        self.down_default
    }

    #[inline]
    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.floor(), self.ceiling)
    }

    /// Effective cap on lower bounds under the frequency rule.
    #[inline]
    fn frequency_cap(&self) -> f64 {
        self.frequency_down_cap.max(self.floor())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.down_default <= 0.0 {
            return Err(format!("down_default ({}) must be positive", self.down_default));
        }
        if self.down_default >= self.up_default {
            return Err(format!(
                "down_default ({}) must be less than up_default ({})",
                self.down_default, self.up_default
            ));
        }
        if self.up_default > self.ceiling {
            return Err(format!(
                "up_default ({}) must not exceed ceiling ({})",
                self.up_default, self.ceiling
            ));
        }
        if self.frequency_step < 0.0 {
            return Err(format!(
                "frequency_step ({}) must be non-negative",
                self.frequency_step
            ));
        }
        Ok(())
    }
}

/// One open band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub down: f64,
    pub up: f64,
}

impl Band {
    fn defaults(limits: &BandLimits) -> Self {
        Self {
            down: limits.down_default,
            up: limits.up_default,
        }
    }

    /// Strict membership: `down < x < up`.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        self.down < x && x < self.up
    }

    fn widen(self, step: f64, limits: &BandLimits) -> Self {
        Self {
            down: limits.clamp(self.down - step),
            up: limits.clamp(self.up + step),
        }
    }

    fn narrow(self, step: f64, limits: &BandLimits) -> Self {
        Self {
            down: limits.clamp(self.down + step),
            up: limits.clamp(self.up - step),
        }
    }

    /// Move each bound toward its default by `step` without crossing it.
    fn narrow_toward_default(self, step: f64, limits: &BandLimits) -> Self {
        Self {
            down: limits.clamp(approach(self.down, limits.down_default, step)),
            up: limits.clamp(approach(self.up, limits.up_default, step)),
        }
    }
}

fn approach(value: f64, target: f64, step: f64) -> f64 {
    if value > target {
        (value - step).max(target)
    } else {
        (value + step).min(target)
    }
}

/// Adaptive band state, persisted every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandState {
    pub long: Band,
    pub short: Band,
    pub long_open_count: u32,
    pub short_open_count: u32,
}

impl BandState {
    /// Defaults for a fresh day or after a take-profit.
    pub fn new(limits: &BandLimits) -> Self {
        Self {
            long: Band::defaults(limits),
            short: Band::defaults(limits),
            long_open_count: 0,
            short_open_count: 0,
        }
    }

    pub fn band(&self, side: Side) -> Band {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }

    fn band_mut(&mut self, side: Side) -> &mut Band {
        match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        }
    }

    pub fn open_count(&self, side: Side) -> u32 {
        match side {
            Side::Long => self.long_open_count,
            Side::Short => self.short_open_count,
        }
    }

    /// Count one successful open on `side`.
    pub fn record_open(&mut self, side: Side) {
        match side {
            Side::Long => self.long_open_count = self.long_open_count.saturating_add(1),
            Side::Short => self.short_open_count = self.short_open_count.saturating_add(1),
        }
    }

    /// Every bound lies on the rails.
    #[must_use]
    pub fn within_rails(&self, limits: &BandLimits) -> bool {
        [self.long.down, self.long.up, self.short.down, self.short.up]
            .iter()
            .all(|b| *b >= limits.floor() && *b <= limits.ceiling)
    }

    /// Pull any out-of-rail bound back in. Used after loading a snapshot
    /// written under different limits.
    pub fn clamp_to_rails(&mut self, limits: &BandLimits) {
        for band in [&mut self.long, &mut self.short] {
            band.down = limits.clamp(band.down);
            band.up = limits.clamp(band.up);
        }
    }
}

/// Re-tune `band` from a move `m` in the direction of the position just opened.
fn retune_opposite(band: Band, m: f64, limits: &BandLimits) -> Band {
    if m > 0.0 && m < SMALL_MOVE {
        band.widen(WIDE_STEP, limits)
    } else if (SMALL_MOVE..MODERATE_MOVE).contains(&m) {
        band.widen(FINE_STEP, limits)
    } else if m >= MODERATE_MOVE {
        band.narrow_toward_default(FINE_STEP, limits)
    } else if m <= -SMALL_MOVE {
        band.narrow(WIDE_STEP, limits)
    } else if m < 0.0 {
        band.narrow(FINE_STEP, limits)
    } else {
        band
    }
}

/// Re-tune the short band after a long open.
///
/// `last == 0` is a no-op.
pub fn adjust_after_long_open(
    state: &BandState,
    last: Price,
    current: Price,
    limits: &BandLimits,
) -> BandState {
    let Some(r) = pct_change(last, current) else {
        return *state;
    };
    let mut next = *state;
    next.short = retune_opposite(state.short, r, limits);
    next
}

/// Re-tune the long band after a short open. Mirror of
/// [`adjust_after_long_open`]: a falling price is the favourable move.
pub fn adjust_after_short_open(
    state: &BandState,
    last: Price,
    current: Price,
    limits: &BandLimits,
) -> BandState {
    let Some(r) = pct_change(last, current) else {
        return *state;
    };
    let mut next = *state;
    next.long = retune_opposite(state.long, -r, limits);
    next
}

/// Narrow `side`'s own band by `step × open_count` once the count reaches
/// the threshold. Lower bound is capped at the frequency cap.
pub fn adjust_for_frequency(state: &BandState, side: Side, limits: &BandLimits) -> BandState {
    let count = state.open_count(side);
    if count < limits.frequency_threshold {
        return *state;
    }

    let delta = limits.frequency_step * f64::from(count);
    let mut next = *state;
    let band = next.band_mut(side);
    let cap = limits.frequency_cap();
    if band.down < cap {
        band.down = limits.clamp((band.down + delta).min(cap));
    }
    band.up = limits.clamp(band.up - delta);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn px(v: Decimal) -> Price {
        Price::new(v)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_defaults() {
        let limits = BandLimits::default();
        let state = BandState::new(&limits);
        assert_eq!(state.long, Band { down: 0.0015, up: 0.0055 });
        assert_eq!(state.short, state.long);
        assert!(state.within_rails(&limits));
    }

    #[test]
    fn test_last_zero_is_noop() {
        let limits = BandLimits::default();
        let state = BandState::new(&limits);
        assert_eq!(
            adjust_after_long_open(&state, Price::ZERO, px(dec!(100)), &limits),
            state
        );
        assert_eq!(
            adjust_after_short_open(&state, Price::ZERO, px(dec!(100)), &limits),
            state
        );
    }

    #[test]
    fn test_small_rise_widens_short_band() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.short = Band { down: 0.0030, up: 0.0050 };

        // r = 0.0003
        let next = adjust_after_long_open(&state, px(dec!(10000)), px(dec!(10003)), &limits);
        assert!(approx(next.short.down, 0.0025));
        assert!(approx(next.short.up, 0.0055));
        assert_eq!(next.long, state.long);
    }

    #[test]
    fn test_moderate_rise_widens_by_fine_step() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.short = Band { down: 0.0030, up: 0.0050 };

        // r = 0.0005 exactly
        let next = adjust_after_long_open(&state, px(dec!(10000)), px(dec!(10005)), &limits);
        assert!(approx(next.short.down, 0.0028));
        assert!(approx(next.short.up, 0.0052));
    }

    #[test]
    fn test_large_rise_returns_toward_default() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.short = Band { down: 0.0016, up: 0.0065 };

        // r = 0.002
        let next = adjust_after_long_open(&state, px(dec!(1000)), px(dec!(1002)), &limits);
        assert!(approx(next.short.down, limits.down_default));
        assert!(approx(next.short.up, 0.0063));
    }

    #[test]
    fn test_adverse_move_narrows() {
        let limits = BandLimits::default();
        let state = BandState::new(&limits);

        // r = -0.001 after a long open
        let next = adjust_after_long_open(&state, px(dec!(1000)), px(dec!(999)), &limits);
        assert!(approx(next.short.down, 0.0020));
        assert!(approx(next.short.up, 0.0050));
    }

    #[test]
    fn test_short_open_mirrors_on_long_band() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.long = Band { down: 0.0030, up: 0.0050 };

        // falling 0.0003 is the favourable move for a short
        let next = adjust_after_short_open(&state, px(dec!(10000)), px(dec!(9997)), &limits);
        assert!(approx(next.long.down, 0.0025));
        assert!(approx(next.long.up, 0.0055));
        assert_eq!(next.short, state.short);
    }

    #[test]
    fn test_frequency_below_threshold_is_noop() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.long_open_count = 2;
        assert_eq!(adjust_for_frequency(&state, Side::Long, &limits), state);
    }

    #[test]
    fn test_frequency_narrows_long_band_after_three_opens() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        for _ in 0..3 {
            state.record_open(Side::Long);
        }

        let next = adjust_for_frequency(&state, Side::Long, &limits);
        assert!(next.long.down > state.long.down);
        assert!(next.long.up < state.long.up);
        assert!(next.long.down <= 0.0025);
        assert!(next.long.up <= 0.0065);
        assert!(approx(next.long.down, 0.0018));
        assert!(approx(next.long.up, 0.0052));
        assert_eq!(next.short, state.short);
    }

    #[test]
    fn test_frequency_down_cap() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.short_open_count = 20;

        let next = adjust_for_frequency(&state, Side::Short, &limits);
        assert!(approx(next.short.down, 0.0025));
        assert!(next.within_rails(&limits));
    }

    #[test]
    fn test_clamp_to_rails_after_load() {
        let limits = BandLimits::default();
        let mut state = BandState::new(&limits);
        state.long.up = 0.01;
        state.short.down = 0.0001;
        state.clamp_to_rails(&limits);
        assert!(state.within_rails(&limits));
    }

    #[test]
    fn test_validate_rejects_inverted_defaults() {
        let limits = BandLimits {
            down_default: 0.006,
            up_default: 0.005,
            ..Default::default()
        };
        assert!(limits.validate().is_err());
        assert!(BandLimits::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_bands_stay_within_rails(
            moves in proptest::collection::vec((-200i64..200i64, 0u8..3u8), 1..200)
        ) {
            let limits = BandLimits::default();
            let mut state = BandState::new(&limits);
            let mut last = Price::new(dec!(2000));

            for (bp_tenths, action) in moves {
                // move in tenths of a basis point
                let current = Price::new(last.inner() * (Decimal::ONE + Decimal::new(bp_tenths, 5)));
                state = match action {
                    0 => {
                        state.record_open(Side::Long);
                        let s = adjust_for_frequency(&state, Side::Long, &limits);
                        adjust_after_long_open(&s, last, current, &limits)
                    }
                    1 => {
                        state.record_open(Side::Short);
                        let s = adjust_for_frequency(&state, Side::Short, &limits);
                        adjust_after_short_open(&s, last, current, &limits)
                    }
                    _ => state,
                };
                prop_assert!(state.within_rails(&limits), "{:?}", state);
                last = current;
            }
        }
    }
}

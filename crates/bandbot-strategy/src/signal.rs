//! Entry signals.

use bandbot_core::{MarketSnapshot, Side, Size, Trend};

use crate::band::BandState;
use crate::gate::{FeatureVector, PredictiveGate};

/// The per-cycle values an entry decision reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInputs {
    pub daily_pct: f64,
    pub cycle_pct: f64,
    pub average: Trend<f64>,
    pub index: Trend<f64>,
    pub bid_size: Trend<Size>,
    pub ask_size: Trend<Size>,
    pub volume_24h: Trend<Size>,
}

impl SignalInputs {
    /// Build from a snapshot. `None` if the reference close is zero.
    ///
    /// On the first cycle there is no previous price, so the cycle change is
    /// zero and neither side can fire.
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Option<Self> {
        let daily_pct = snapshot.daily_pct()?;
        Some(Self {
            daily_pct,
            cycle_pct: snapshot.cycle_pct().unwrap_or(0.0),
            average: snapshot.average,
            index: snapshot.index,
            bid_size: snapshot.bid_size,
            ask_size: snapshot.ask_size,
            volume_24h: snapshot.volume_24h,
        })
    }
}

/// Long entry: daily change inside the long band with every trend agreeing.
#[must_use]
pub fn long_signal(bands: &BandState, inputs: &SignalInputs, open_limit: u32) -> bool {
    bands.long.contains(inputs.daily_pct)
        && inputs.average.non_decreasing()
        && inputs.index.non_decreasing()
        && bands.long_open_count <= open_limit
        && inputs.bid_size.non_decreasing()
        && inputs.volume_24h.non_decreasing()
        && inputs.cycle_pct > 0.0
}

/// Short entry: structural mirror of [`long_signal`] on the negated daily
/// change, using ask depth.
#[must_use]
pub fn short_signal(bands: &BandState, inputs: &SignalInputs, open_limit: u32) -> bool {
    bands.short.contains(-inputs.daily_pct)
        && inputs.average.non_increasing()
        && inputs.index.non_increasing()
        && bands.short_open_count <= open_limit
        && inputs.ask_size.non_decreasing()
        && inputs.volume_24h.non_decreasing()
        && inputs.cycle_pct < 0.0
}

/// Pick at most one entry side. Long has priority: when it qualifies the
/// short side is not looked at, even if the gate then vetoes the long.
pub fn evaluate_entry(
    bands: &BandState,
    inputs: &SignalInputs,
    long_open_limit: u32,
    short_open_limit: u32,
    gate: &dyn PredictiveGate,
    features: &FeatureVector,
) -> Option<Side> {
    let side = if long_signal(bands, inputs, long_open_limit) {
        Side::Long
    } else if short_signal(bands, inputs, short_open_limit) {
        Side::Short
    } else {
        return None;
    };

    if gate.permits(side, features) {
        Some(side)
    } else {
        tracing::info!(%side, "Entry vetoed by predictive gate");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::{Band, BandLimits};
    use rust_decimal_macros::dec;

    struct Deny;

    impl PredictiveGate for Deny {
        fn permits(&self, _side: Side, _features: &FeatureVector) -> bool {
            false
        }
    }

    struct Allow;

    impl PredictiveGate for Allow {
        fn permits(&self, _side: Side, _features: &FeatureVector) -> bool {
            true
        }
    }

    fn rising_inputs(daily_pct: f64, cycle_pct: f64) -> SignalInputs {
        SignalInputs {
            daily_pct,
            cycle_pct,
            average: Trend::new(100.0, 100.5),
            index: Trend::new(1.00, 1.01),
            bid_size: Trend::new(Size::new(dec!(10)), Size::new(dec!(12))),
            ask_size: Trend::new(Size::new(dec!(10)), Size::new(dec!(9))),
            volume_24h: Trend::new(Size::new(dec!(1000)), Size::new(dec!(1001))),
        }
    }

    fn falling_inputs(daily_pct: f64, cycle_pct: f64) -> SignalInputs {
        SignalInputs {
            daily_pct,
            cycle_pct,
            average: Trend::new(100.5, 100.0),
            index: Trend::new(1.01, 1.00),
            bid_size: Trend::new(Size::new(dec!(12)), Size::new(dec!(10))),
            ask_size: Trend::new(Size::new(dec!(9)), Size::new(dec!(10))),
            volume_24h: Trend::new(Size::new(dec!(1000)), Size::new(dec!(1001))),
        }
    }

    #[test]
    fn test_long_signal_scenario() {
        let bands = BandState::new(&BandLimits::default());
        assert_eq!(bands.long, Band { down: 0.0015, up: 0.0055 });

        assert!(long_signal(&bands, &rising_inputs(0.003, 0.0008), 10));
        assert!(!long_signal(&bands, &rising_inputs(0.003, -0.0001), 10));
    }

    #[test]
    fn test_long_signal_band_is_open_interval() {
        let bands = BandState::new(&BandLimits::default());
        assert!(!long_signal(&bands, &rising_inputs(0.0015, 0.001), 10));
        assert!(!long_signal(&bands, &rising_inputs(0.0055, 0.001), 10));
    }

    #[test]
    fn test_long_signal_respects_open_limit() {
        let mut bands = BandState::new(&BandLimits::default());
        bands.long_open_count = 10;
        assert!(long_signal(&bands, &rising_inputs(0.003, 0.001), 10));
        bands.long_open_count = 11;
        assert!(!long_signal(&bands, &rising_inputs(0.003, 0.001), 10));
    }

    #[test]
    fn test_long_signal_needs_depth_and_volume() {
        let bands = BandState::new(&BandLimits::default());
        let mut inputs = rising_inputs(0.003, 0.001);
        inputs.bid_size = Trend::new(Size::new(dec!(12)), Size::new(dec!(11)));
        assert!(!long_signal(&bands, &inputs, 10));

        let mut inputs = rising_inputs(0.003, 0.001);
        inputs.volume_24h = Trend::new(Size::new(dec!(1000)), Size::new(dec!(999)));
        assert!(!long_signal(&bands, &inputs, 10));
    }

    #[test]
    fn test_short_signal_mirror() {
        let bands = BandState::new(&BandLimits::default());
        assert!(short_signal(&bands, &falling_inputs(-0.003, -0.0008), 10));
        assert!(!short_signal(&bands, &falling_inputs(-0.003, 0.0001), 10));
        assert!(!short_signal(&bands, &falling_inputs(0.003, -0.0008), 10));
    }

    #[test]
    fn test_evaluate_entry_priority_and_gate() {
        let bands = BandState::new(&BandLimits::default());
        let features = FeatureVector::default();

        let side = evaluate_entry(&bands, &rising_inputs(0.003, 0.001), 10, 10, &Allow, &features);
        assert_eq!(side, Some(Side::Long));

        let side = evaluate_entry(&bands, &falling_inputs(-0.003, -0.001), 10, 10, &Allow, &features);
        assert_eq!(side, Some(Side::Short));

        let side = evaluate_entry(&bands, &rising_inputs(0.003, 0.001), 10, 10, &Deny, &features);
        assert_eq!(side, None);
    }
}

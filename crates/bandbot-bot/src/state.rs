//! Adaptive state owned by the orchestration loop.

use chrono::NaiveDate;

use bandbot_persistence::StateSnapshot;
use bandbot_risk::{RiskConfig, RiskState};
use bandbot_strategy::{Band, BandLimits, BandState, IntervalCounters, SleepWindow};

/// Everything the loop mutates from cycle to cycle.
///
/// Only the orchestration worker holds this; side workers see copies of it
/// through the record queue.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub bands: BandState,
    pub counters: IntervalCounters,
    pub risk: RiskState,
    /// Not persisted: resets to the configured initial window on restart.
    pub window: SleepWindow,
    pub trading_day: Option<NaiveDate>,
}

impl EngineState {
    /// Fresh state for `trading_day`.
    pub fn defaults(
        limits: &BandLimits,
        risk: &RiskConfig,
        window: SleepWindow,
        trading_day: Option<NaiveDate>,
    ) -> Self {
        Self {
            bands: BandState::new(limits),
            counters: IntervalCounters::new(),
            risk: RiskState::new(risk),
            window,
            trading_day,
        }
    }

    /// Rebuild from a persisted snapshot.
    ///
    /// Bands written under other limits are pulled back onto the rails; a
    /// snapshot without a cap gets the configured baseline.
    pub fn from_snapshot(
        snapshot: &StateSnapshot,
        limits: &BandLimits,
        risk: &RiskConfig,
        window: SleepWindow,
    ) -> Self {
        let mut bands = BandState {
            long: Band {
                down: snapshot.long_down,
                up: snapshot.long_up,
            },
            short: Band {
                down: snapshot.short_down,
                up: snapshot.short_up,
            },
            long_open_count: snapshot.long_open_count,
            short_open_count: snapshot.short_open_count,
        };
        bands.clamp_to_rails(limits);

        Self {
            bands,
            counters: IntervalCounters {
                up: [snapshot.u_p_1, snapshot.u_p_2, snapshot.u_p_3, snapshot.u_p_4],
                down: [snapshot.d_p_1, snapshot.d_p_2, snapshot.d_p_3, snapshot.d_p_4],
            },
            risk: RiskState {
                order_size_units: snapshot.order_size_units.max(1),
                position_value_cap: snapshot
                    .position_value_cap
                    .unwrap_or(risk.base_position_cap),
                cumulative_loss: snapshot.cumulative_loss,
                cumulative_profit: snapshot.cumulative_profit,
            },
            window,
            trading_day: snapshot.trading_day,
        }
    }

    #[must_use]
    pub fn to_snapshot(&self) -> StateSnapshot {
        let [u_p_1, u_p_2, u_p_3, u_p_4] = self.counters.up;
        let [d_p_1, d_p_2, d_p_3, d_p_4] = self.counters.down;
        StateSnapshot {
            long_down: self.bands.long.down,
            long_up: self.bands.long.up,
            short_down: self.bands.short.down,
            short_up: self.bands.short.up,
            long_open_count: self.bands.long_open_count,
            short_open_count: self.bands.short_open_count,
            u_p_1,
            u_p_2,
            u_p_3,
            u_p_4,
            d_p_1,
            d_p_2,
            d_p_3,
            d_p_4,
            order_size_units: self.risk.order_size_units,
            cumulative_loss: self.risk.cumulative_loss,
            cumulative_profit: self.risk.cumulative_profit,
            position_value_cap: Some(self.risk.position_value_cap),
            trading_day: self.trading_day,
        }
    }

    /// After a take-profit: bands, counters, sizing and pacing back to baseline.
    pub fn reset_after_take_profit(
        &mut self,
        limits: &BandLimits,
        risk: &RiskConfig,
        window: SleepWindow,
    ) {
        self.bands = BandState::new(limits);
        self.counters = IntervalCounters::new();
        self.risk.reset_sizing(risk);
        self.window = window;
    }

    /// Start of a new trading day. Cumulative pnl carries over.
    pub fn reset_for_new_day(
        &mut self,
        day: NaiveDate,
        limits: &BandLimits,
        risk: &RiskConfig,
        window: SleepWindow,
    ) {
        self.reset_after_take_profit(limits, risk, window);
        self.trading_day = Some(day);
    }
}

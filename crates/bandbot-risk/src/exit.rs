//! Take-profit rules.
//!
//! Take-profit is only considered once the daily change has left the quiet
//! zone (`|daily_pct| > take_profit_floor`) and a position is held. Inside
//! that region two rules close the position:
//! - extreme move: `|daily_pct| > extreme_move`, whatever the direction held
//! - drift: any interval counter above its threshold, on the matching side
//!
//! Stop-loss is evaluated by the gateway against the unrealized ratio.

use serde::{Deserialize, Serialize};

use bandbot_core::{PositionInfo, Side};
use bandbot_strategy::IntervalCounters;

/// Take-profit thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitConfig {
    #[serde(default = "default_take_profit_floor")]
    pub take_profit_floor: f64,
    #[serde(default = "default_extreme_move")]
    pub extreme_move: f64,
    /// Up counters that close a long when exceeded.
    #[serde(default = "default_up_thresholds")]
    pub up_thresholds: [u32; 4],
    /// Down counters that close a short when exceeded.
    #[serde(default = "default_down_thresholds")]
    pub down_thresholds: [u32; 4],
}

fn default_take_profit_floor() -> f64 {
    0.012
}

fn default_extreme_move() -> f64 {
    0.25
}

fn default_up_thresholds() -> [u32; 4] {
    [20, 27, 40, 6]
}

fn default_down_thresholds() -> [u32; 4] {
    [10, 13, 20, 3]
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            take_profit_floor: default_take_profit_floor(),
            extreme_move: default_extreme_move(),
            up_thresholds: default_up_thresholds(),
            down_thresholds: default_down_thresholds(),
        }
    }
}

/// Why a take-profit fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeProfitReason {
    ExtremeMove,
    CounterThreshold,
}

/// A take-profit to execute on the held side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeProfit {
    pub side: Side,
    pub reason: TakeProfitReason,
}

/// Decide whether the held position should be closed for profit.
pub fn evaluate_take_profit(
    daily_pct: f64,
    position: Option<&PositionInfo>,
    counters: &IntervalCounters,
    config: &ExitConfig,
) -> Option<TakeProfit> {
    if daily_pct.abs() <= config.take_profit_floor {
        return None;
    }
    let side = position.and_then(PositionInfo::side)?;

    if daily_pct.abs() > config.extreme_move {
        return Some(TakeProfit {
            side,
            reason: TakeProfitReason::ExtremeMove,
        });
    }

    let drifted = match side {
        Side::Long => counters.any_up_above(&config.up_thresholds),
        Side::Short => counters.any_down_above(&config.down_thresholds),
    };
    drifted.then_some(TakeProfit {
        side,
        reason: TakeProfitReason::CounterThreshold,
    })
}

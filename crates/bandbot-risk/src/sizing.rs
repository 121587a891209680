//! Order sizing and position cap.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use bandbot_core::{PositionInfo, Side};

use crate::error::{RiskError, RiskResult};

/// Sizing baselines and escalation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Order size in contract units after a reset.
    #[serde(default = "default_base_order_units")]
    pub base_order_units: u32,
    /// Position value cap (quote currency) after a reset.
    #[serde(default = "default_base_position_cap")]
    pub base_position_cap: Decimal,
    /// Cap increase per stop-loss.
    #[serde(default = "default_cap_increment")]
    pub cap_increment: Decimal,
    /// Same-direction opens stop this far below the cap.
    #[serde(default = "default_cap_headroom")]
    pub cap_headroom: Decimal,
    /// Unrealized ratio below which a position is stopped out.
    #[serde(default = "default_stop_loss_ratio")]
    pub stop_loss_ratio: f64,
}

fn default_base_order_units() -> u32 {
    1
}

fn default_base_position_cap() -> Decimal {
    Decimal::from(150)
}

fn default_cap_increment() -> Decimal {
    Decimal::from(25)
}

fn default_cap_headroom() -> Decimal {
    Decimal::from(10)
}

fn default_stop_loss_ratio() -> f64 {
    -0.5
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_order_units: default_base_order_units(),
            base_position_cap: default_base_position_cap(),
            cap_increment: default_cap_increment(),
            cap_headroom: default_cap_headroom(),
            stop_loss_ratio: default_stop_loss_ratio(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if self.base_order_units == 0 {
            return Err(RiskError::ConfigError(
                "base_order_units must be at least 1".to_string(),
            ));
        }
        if self.base_position_cap <= self.cap_headroom {
            return Err(RiskError::ConfigError(format!(
                "base_position_cap ({}) must exceed cap_headroom ({})",
                self.base_position_cap, self.cap_headroom
            )));
        }
        if self.cap_increment.is_sign_negative() {
            return Err(RiskError::ConfigError(format!(
                "cap_increment ({}) must be non-negative",
                self.cap_increment
            )));
        }
        if self.stop_loss_ratio >= 0.0 {
            return Err(RiskError::ConfigError(format!(
                "stop_loss_ratio ({}) must be negative",
                self.stop_loss_ratio
            )));
        }
        Ok(())
    }
}

/// Result of the cap check before an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDecision {
    Allowed,
    /// A same-direction position already sits at or above `cap - headroom`.
    CapReached { notional: Decimal, limit: Decimal },
}

/// Mutable sizing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub order_size_units: u32,
    pub position_value_cap: Decimal,
    pub cumulative_loss: Decimal,
    pub cumulative_profit: Decimal,
}

impl RiskState {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            order_size_units: config.base_order_units.max(1),
            position_value_cap: config.base_position_cap,
            cumulative_loss: Decimal::ZERO,
            cumulative_profit: Decimal::ZERO,
        }
    }

    /// After a stop-loss: bigger orders, higher cap.
    pub fn escalate(&mut self, config: &RiskConfig) {
        self.order_size_units = self.order_size_units.saturating_add(1);
        self.position_value_cap += config.cap_increment;
        info!(
            order_size_units = self.order_size_units,
            position_value_cap = %self.position_value_cap,
            "Sizing escalated after stop-loss"
        );
    }

    /// After a take-profit: back to baseline. Cumulative pnl is kept.
    pub fn reset_sizing(&mut self, config: &RiskConfig) {
        self.order_size_units = config.base_order_units.max(1);
        self.position_value_cap = config.base_position_cap;
    }

    /// Book a settled realized pnl.
    pub fn record_realized(&mut self, pnl: Decimal) {
        if pnl.is_sign_negative() {
            self.cumulative_loss += pnl;
        } else {
            self.cumulative_profit += pnl;
        }
    }

    /// Cap check for opening on `side` given the current position.
    ///
    /// Only a same-direction position counts against the cap; flat or
    /// opposite-direction is always allowed.
    pub fn check_open(
        &self,
        side: Side,
        position: Option<&PositionInfo>,
        config: &RiskConfig,
    ) -> OpenDecision {
        let Some(position) = position else {
            return OpenDecision::Allowed;
        };
        if position.side() != Some(side) {
            return OpenDecision::Allowed;
        }

        let notional = position.notional.abs();
        let limit = self.position_value_cap - config.cap_headroom;
        if notional >= limit {
            OpenDecision::CapReached { notional, limit }
        } else {
            OpenDecision::Allowed
        }
    }
}

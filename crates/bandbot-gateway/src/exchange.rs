//! Exchange gateway interface.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bandbot_core::{InstrumentId, PositionInfo, Side, Size, Ticker};

use crate::error::GatewayResult;

/// Acknowledgement of an order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub accepted: bool,
    pub filled_size: Size,
    pub order_id: Option<String>,
}

impl OrderAck {
    pub fn rejected() -> Self {
        Self {
            accepted: false,
            filled_size: Size::ZERO,
            order_id: None,
        }
    }
}

/// Which positions `close_all` is allowed to close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseMode {
    /// Close only a position whose unrealized ratio is negative and below
    /// `ratio_threshold`.
    StopLoss { ratio_threshold: f64 },
    /// Close any held position.
    TakeProfit,
}

impl CloseMode {
    /// Whether a position with `unrealized_ratio` qualifies.
    #[must_use]
    pub fn qualifies(&self, unrealized_ratio: f64) -> bool {
        match self {
            Self::StopLoss { ratio_threshold } => {
                unrealized_ratio < 0.0 && unrealized_ratio < *ratio_threshold
            }
            Self::TakeProfit => true,
        }
    }
}

/// Result of a close that was attempted. `None` from `close_all` means
/// nothing qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseOutcome {
    Closed,
    Failed,
}

impl CloseOutcome {
    /// Legacy outcome code: 1 closed, -1 failed.
    pub fn code(&self) -> i8 {
        match self {
            Self::Closed => 1,
            Self::Failed => -1,
        }
    }
}

/// Trading venue used by the orchestration loop.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Latest ticker for `instrument`, including the previous day's close.
    async fn get_ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker>;

    /// All open positions.
    async fn get_positions(&self) -> GatewayResult<Vec<PositionInfo>>;

    /// Market order for `units` contracts on `side`.
    async fn open_order(
        &self,
        instrument: &InstrumentId,
        side: Side,
        units: u32,
        leverage: u32,
    ) -> GatewayResult<OrderAck>;

    /// Close the held position on `instrument` if it qualifies under `mode`.
    async fn close_all(
        &self,
        instrument: &InstrumentId,
        leverage: u32,
        mode: CloseMode,
    ) -> GatewayResult<Option<CloseOutcome>>;

    /// Realized pnl of the most recently closed position, if any.
    ///
    /// May lag a close by a few seconds; callers poll.
    async fn last_closed_pnl(&self, instrument: &InstrumentId) -> GatewayResult<Option<Decimal>>;

    /// Position on `instrument`, if one is held.
    async fn position(&self, instrument: &InstrumentId) -> GatewayResult<Option<PositionInfo>> {
        Ok(self
            .get_positions()
            .await?
            .into_iter()
            .find(|p| &p.instrument == instrument && !p.size.is_zero()))
    }
}

//! Observation mode: reads pass through, orders are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use bandbot_core::{InstrumentId, PositionInfo, Side, Ticker};

use crate::error::GatewayResult;
use crate::exchange::{CloseMode, CloseOutcome, ExchangeGateway, OrderAck};

/// Wraps a gateway so that the loop can run without ever trading.
pub struct ObservationExchange {
    inner: Arc<dyn ExchangeGateway>,
}

impl ObservationExchange {
    pub fn new(inner: Arc<dyn ExchangeGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ExchangeGateway for ObservationExchange {
    async fn get_ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker> {
        self.inner.get_ticker(instrument).await
    }

    async fn get_positions(&self) -> GatewayResult<Vec<PositionInfo>> {
        self.inner.get_positions().await
    }

    async fn open_order(
        &self,
        instrument: &InstrumentId,
        side: Side,
        units: u32,
        leverage: u32,
    ) -> GatewayResult<OrderAck> {
        info!(%instrument, %side, units, leverage, "Observation mode: open order not sent");
        Ok(OrderAck::rejected())
    }

    async fn close_all(
        &self,
        instrument: &InstrumentId,
        leverage: u32,
        mode: CloseMode,
    ) -> GatewayResult<Option<CloseOutcome>> {
        info!(%instrument, leverage, ?mode, "Observation mode: close not sent");
        Ok(None)
    }

    async fn last_closed_pnl(&self, instrument: &InstrumentId) -> GatewayResult<Option<Decimal>> {
        self.inner.last_closed_pnl(instrument).await
    }
}

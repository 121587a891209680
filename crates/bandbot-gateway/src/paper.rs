//! Simulated single-account exchange.
//!
//! Tickers come from a wrapped [`MarketDataSource`]; each fetched ticker
//! becomes the mark price for that instrument. Orders fill immediately at the
//! mark. Positions are netted per instrument: an opposite-side order reduces
//! or flips the position and realizes pnl on the reduced part.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use bandbot_core::{InstrumentId, PositionInfo, Price, Side, Size, Ticker};

use crate::error::GatewayResult;
use crate::exchange::{CloseMode, CloseOutcome, ExchangeGateway, OrderAck};
use crate::market_data::MarketDataSource;

/// Paper account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Underlying quantity per contract (e.g. 0.1 ETH for ETH-USDT-SWAP).
    #[serde(default = "default_contract_value")]
    pub contract_value: Decimal,
}

fn default_contract_value() -> Decimal {
    Decimal::new(1, 1)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            contract_value: default_contract_value(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PaperPosition {
    /// Signed contracts.
    size: Decimal,
    entry: Decimal,
    leverage: u32,
}

#[derive(Debug, Default)]
struct PaperBook {
    marks: HashMap<InstrumentId, Price>,
    positions: HashMap<InstrumentId, PaperPosition>,
    last_closed_pnl: HashMap<InstrumentId, Decimal>,
    reject_orders: bool,
}

/// In-process exchange for paper trading and tests.
pub struct PaperExchange {
    market_data: Arc<dyn MarketDataSource>,
    config: PaperConfig,
    book: Mutex<PaperBook>,
}

impl PaperExchange {
    pub fn new(market_data: Arc<dyn MarketDataSource>, config: PaperConfig) -> Self {
        Self {
            market_data,
            config,
            book: Mutex::new(PaperBook::default()),
        }
    }

    /// Make every subsequent order fail (exercises failure paths).
    pub fn set_reject_orders(&self, reject: bool) {
        self.book.lock().reject_orders = reject;
    }

    /// Override the mark price of `instrument`.
    pub fn set_mark(&self, instrument: &InstrumentId, mark: Price) {
        self.book.lock().marks.insert(instrument.clone(), mark);
    }

    fn position_info(&self, instrument: &InstrumentId, pos: &PaperPosition, mark: Price) -> PositionInfo {
        let units = pos.size * self.config.contract_value;
        let notional = (units * mark.inner()).abs();
        let upl = units * (mark.inner() - pos.entry);
        let margin = (units * pos.entry).abs() / Decimal::from(pos.leverage.max(1));
        let unrealized_ratio = if margin.is_zero() {
            0.0
        } else {
            (upl / margin).to_f64().unwrap_or(0.0)
        };
        PositionInfo {
            instrument: instrument.clone(),
            size: Size::new(pos.size),
            notional,
            unrealized_ratio,
        }
    }

    /// Apply a fill of `signed` contracts at `mark`; returns realized pnl.
    fn apply_fill(&self, pos: &mut PaperPosition, signed: Decimal, mark: Decimal) -> Decimal {
        let same_direction = pos.size.is_zero() || pos.size.is_sign_positive() == signed.is_sign_positive();
        if same_direction {
            let total = pos.size + signed;
            if !total.is_zero() {
                pos.entry = (pos.entry * pos.size.abs() + mark * signed.abs()) / total.abs();
            }
            pos.size = total;
            return Decimal::ZERO;
        }

        let reduced = signed.abs().min(pos.size.abs());
        let direction = if pos.size.is_sign_positive() {
            Decimal::ONE
        } else {
            -Decimal::ONE
        };
        let realized = reduced * self.config.contract_value * (mark - pos.entry) * direction;
        pos.size += signed;
        if !pos.size.is_zero() && pos.size.is_sign_positive() == signed.is_sign_positive() {
            // Flipped through zero: the remainder opened at the mark.
            pos.entry = mark;
        }
        realized
    }
}

#[async_trait]
impl ExchangeGateway for PaperExchange {
    async fn get_ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker> {
        let ticker = self.market_data.ticker(instrument).await?;
        self.set_mark(instrument, ticker.last);
        Ok(ticker)
    }

    async fn get_positions(&self) -> GatewayResult<Vec<PositionInfo>> {
        let book = self.book.lock();
        Ok(book
            .positions
            .iter()
            .filter(|(_, pos)| !pos.size.is_zero())
            .map(|(id, pos)| {
                let mark = book.marks.get(id).copied().unwrap_or(Price::new(pos.entry));
                self.position_info(id, pos, mark)
            })
            .collect())
    }

    async fn open_order(
        &self,
        instrument: &InstrumentId,
        side: Side,
        units: u32,
        leverage: u32,
    ) -> GatewayResult<OrderAck> {
        let mut book = self.book.lock();
        let mark = book.marks.get(instrument).copied().unwrap_or(Price::ZERO);
        if book.reject_orders || !mark.is_positive() || units == 0 {
            warn!(%instrument, %side, units, %mark, "Paper order rejected");
            return Ok(OrderAck::rejected());
        }

        let signed = Decimal::from(units) * Decimal::from(side.sign());
        let pos = book.positions.entry(instrument.clone()).or_default();
        pos.leverage = leverage;
        let realized = self.apply_fill(pos, signed, mark.inner());
        if !realized.is_zero() {
            book.last_closed_pnl.insert(instrument.clone(), realized);
        }

        let order_id = Uuid::new_v4().to_string();
        info!(%instrument, %side, units, %mark, order_id = %order_id, "Paper order filled");
        Ok(OrderAck {
            accepted: true,
            filled_size: Size::new(Decimal::from(units)),
            order_id: Some(order_id),
        })
    }

    async fn close_all(
        &self,
        instrument: &InstrumentId,
        _leverage: u32,
        mode: CloseMode,
    ) -> GatewayResult<Option<CloseOutcome>> {
        let mut book = self.book.lock();
        let Some(pos) = book.positions.get(instrument).cloned() else {
            return Ok(None);
        };
        if pos.size.is_zero() {
            return Ok(None);
        }
        let mark = book.marks.get(instrument).copied().unwrap_or(Price::new(pos.entry));
        let info = self.position_info(instrument, &pos, mark);
        if !mode.qualifies(info.unrealized_ratio) {
            return Ok(None);
        }
        if book.reject_orders {
            warn!(%instrument, ?mode, "Paper close rejected");
            return Ok(Some(CloseOutcome::Failed));
        }

        let mut closing = pos;
        let size = closing.size;
        let realized = self.apply_fill(&mut closing, -size, mark.inner());
        book.positions.remove(instrument);
        book.last_closed_pnl.insert(instrument.clone(), realized);
        info!(%instrument, ?mode, %mark, realized = %realized, "Paper position closed");
        Ok(Some(CloseOutcome::Closed))
    }

    async fn last_closed_pnl(&self, instrument: &InstrumentId) -> GatewayResult<Option<Decimal>> {
        Ok(self.book.lock().last_closed_pnl.get(instrument).copied())
    }
}

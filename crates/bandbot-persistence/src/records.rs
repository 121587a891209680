//! Record types shipped to JSON Lines files.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bandbot_core::{InstrumentId, MarketSnapshot, Price, TradeType};

/// One row per orchestration cycle: inputs, decision and resulting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub snapshot: MarketSnapshot,
    pub daily_pct: Option<f64>,
    pub cycle_pct: Option<f64>,
    pub long_down: f64,
    pub long_up: f64,
    pub short_down: f64,
    pub short_up: f64,
    pub long_open_count: u32,
    pub short_open_count: u32,
    pub up_counters: [u32; 4],
    pub down_counters: [u32; 4],
    /// Signed notional of the held position when the cycle started.
    pub position_notional: Decimal,
    pub order_size_units: u32,
    /// Seconds slept after this cycle.
    pub sleep_secs: u64,
    pub trade_type: TradeType,
}

/// Outcome tag of an operator event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Info,
    Success,
    Error,
}

/// Operator-facing business event (trade placed, stop-loss failed, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub at: DateTime<Utc>,
    pub subject: String,
    pub status: EventStatus,
    pub detail: String,
}

impl EventRecord {
    pub fn new(subject: impl Into<String>, status: EventStatus, detail: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            subject: subject.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn info(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(subject, EventStatus::Info, detail)
    }

    pub fn success(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(subject, EventStatus::Success, detail)
    }

    pub fn error(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(subject, EventStatus::Error, detail)
    }
}

/// Reference close of a finished trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCloseRecord {
    pub day: NaiveDate,
    pub instrument: InstrumentId,
    pub reference_close: Price,
    pub archived_at: DateTime<Utc>,
}

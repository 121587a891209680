//! Core domain types for the adaptive band trader.
//!
//! This crate provides the types every other crate speaks:
//! - `Price`, `Size`: precision-safe numeric types
//! - `InstrumentId`, `Side`, `Ticker`, `PositionInfo`: exchange-facing values
//! - `TradeType`: the per-cycle action code carried by real-time records
//! - `MarketSnapshot`, `CycleState`: per-cycle observations and their carry-forward

pub mod decimal;
pub mod error;
pub mod market;
pub mod snapshot;
pub mod trade;

pub use decimal::{pct_change, Price, Size};
pub use error::{CoreError, Result};
pub use market::{InstrumentId, PositionInfo, Side, Ticker};
pub use snapshot::{CycleState, MarketSnapshot, Trend, TRAILING_WINDOW};
pub use trade::TradeType;

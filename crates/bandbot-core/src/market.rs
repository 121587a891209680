//! Exchange-facing market values.

use crate::decimal::{Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange instrument identifier (e.g. `ETH-USDT-SWAP`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// Returns 1 for long, -1 for short.
    pub fn sign(&self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }

    /// Label used for metrics and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One market-data observation for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub instrument: InstrumentId,
    pub last: Price,
    pub bid_size: Size,
    pub ask_size: Size,
    pub volume_24h: Size,
    /// Close of the previous trading day; daily change is measured against it.
    pub reference_close: Price,
    pub observed_at: DateTime<Utc>,
}

/// An open position as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub instrument: InstrumentId,
    /// Signed contract size; negative is short.
    pub size: Size,
    /// Absolute notional in quote currency.
    pub notional: Decimal,
    /// Unrealized pnl over margin.
    pub unrealized_ratio: f64,
}

impl PositionInfo {
    /// Direction of the position, `None` when flat.
    pub fn side(&self) -> Option<Side> {
        if self.size.inner().is_sign_positive() && !self.size.is_zero() {
            Some(Side::Long)
        } else if self.size.inner().is_sign_negative() && !self.size.is_zero() {
            Some(Side::Short)
        } else {
            None
        }
    }

    /// Notional signed by direction: positive long, negative short, zero flat.
    pub fn signed_notional(&self) -> Decimal {
        match self.side() {
            Some(Side::Long) => self.notional.abs(),
            Some(Side::Short) => -self.notional.abs(),
            None => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(size: Decimal, notional: Decimal) -> PositionInfo {
        PositionInfo {
            instrument: InstrumentId::new("ETH-USDT-SWAP"),
            size: Size::new(size),
            notional,
            unrealized_ratio: 0.0,
        }
    }

    #[test]
    fn test_position_side() {
        assert_eq!(position(dec!(2), dec!(60)).side(), Some(Side::Long));
        assert_eq!(position(dec!(-2), dec!(60)).side(), Some(Side::Short));
        assert_eq!(position(dec!(0), dec!(0)).side(), None);
    }

    #[test]
    fn test_signed_notional() {
        assert_eq!(position(dec!(-3), dec!(90)).signed_notional(), dec!(-90));
        assert_eq!(position(dec!(3), dec!(90)).signed_notional(), dec!(90));
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.sign(), -1);
    }
}

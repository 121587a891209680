//! Per-cycle action codes.

use crate::error::CoreError;
use crate::market::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single order action taken in a cycle.
///
/// Serialized as its integer code so downstream consumers of the real-time
/// records keep reading `{0, 1, -1, 2, -2, 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum TradeType {
    #[default]
    None,
    OpenLong,
    OpenShort,
    TakeProfitLong,
    TakeProfitShort,
    StopLoss,
}

impl TradeType {
    pub fn code(&self) -> i8 {
        match self {
            Self::None => 0,
            Self::OpenLong => 1,
            Self::OpenShort => -1,
            Self::TakeProfitLong => 2,
            Self::TakeProfitShort => -2,
            Self::StopLoss => 3,
        }
    }

    pub fn open(side: Side) -> Self {
        match side {
            Side::Long => Self::OpenLong,
            Side::Short => Self::OpenShort,
        }
    }

    pub fn take_profit(side: Side) -> Self {
        match side {
            Side::Long => Self::TakeProfitLong,
            Side::Short => Self::TakeProfitShort,
        }
    }

    #[must_use]
    pub fn is_action(&self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::OpenLong | Self::OpenShort)
    }

    #[must_use]
    pub fn is_take_profit(&self) -> bool {
        matches!(self, Self::TakeProfitLong | Self::TakeProfitShort)
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::OpenLong => "open_long",
            Self::OpenShort => "open_short",
            Self::TakeProfitLong => "take_profit_long",
            Self::TakeProfitShort => "take_profit_short",
            Self::StopLoss => "stop_loss",
        }
    }
}

impl From<TradeType> for i8 {
    fn from(t: TradeType) -> Self {
        t.code()
    }
}

impl TryFrom<i8> for TradeType {
    type Error = CoreError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::OpenLong),
            -1 => Ok(Self::OpenShort),
            2 => Ok(Self::TakeProfitLong),
            -2 => Ok(Self::TakeProfitShort),
            3 => Ok(Self::StopLoss),
            other => Err(CoreError::UnknownTradeType(other)),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Sizing state, exit rules and cooperative shutdown.
//!
//! - `RiskState`: order size and position cap, escalated on stop-loss and
//!   reset on take-profit
//! - `evaluate_take_profit`: extreme-move and counter-threshold exits
//! - `ShutdownLatch`: the single cooperative shutdown flag every worker polls

pub mod error;
pub mod exit;
pub mod shutdown;
pub mod sizing;

pub use error::{RiskError, RiskResult};
pub use exit::{evaluate_take_profit, ExitConfig, TakeProfit, TakeProfitReason};
pub use shutdown::{ShutdownLatch, ShutdownReason};
pub use sizing::{OpenDecision, RiskConfig, RiskState};

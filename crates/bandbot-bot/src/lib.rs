//! Adaptive band trader.
//!
//! Main application that wires the components together:
//! - one sequential orchestration loop (`Engine`) owning all adaptive state
//! - side workers shipping records and events, polling the shutdown switch
//!   and retraining the predictive gate
//! - paper or observation gateways behind the exchange trait

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod retry;
pub mod state;
pub mod training;
pub mod workers;

pub use app::Application;
pub use config::{AppConfig, OperatingMode};
pub use engine::{trading_day, CycleReport, Engine, EngineChannels, EngineDeps, EnginePhase};
pub use error::{AppError, AppResult};
pub use retry::{retry_async, RetryError, RetryPolicy};
pub use state::EngineState;

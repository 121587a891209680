//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] bandbot_strategy::StrategyError),

    #[error("Risk error: {0}")]
    Risk(#[from] bandbot_risk::RiskError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] bandbot_persistence::PersistenceError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] bandbot_gateway::GatewayError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] bandbot_telemetry::TelemetryError),

    #[error("Day rollover failed: {0}")]
    Rollover(String),

    #[error("Queue closed: {0}")]
    QueueClosed(&'static str),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown requested")]
    Shutdown,
}

impl AppError {
    /// Network-level failures worth a plain retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_transient())
    }
}

pub type AppResult<T> = Result<T, AppError>;

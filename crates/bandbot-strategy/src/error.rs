//! Strategy error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient training data: {have} samples, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("Training data has a single class")]
    SingleClass,
}

pub type StrategyResult<T> = Result<T, StrategyError>;

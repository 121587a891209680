//! Gateway error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Exchange API error {code}: {msg}")]
    Api { code: String, msg: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Invalid switch value: {0:?}")]
    InvalidSwitch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Network-level failures worth retrying with a fixed delay.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpClient(_) | Self::Io(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Api { .. }
            | Self::Parse(_)
            | Self::Rejected(_)
            | Self::InvalidSwitch(_)
            | Self::Json(_) => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

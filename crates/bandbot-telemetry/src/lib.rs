//! Prometheus metrics and structured logging for the band trader.
//!
//! - Prometheus metrics for cycles, actions, adaptive state and pacing
//! - Structured logging with tracing (JSON in production)
//! - Daily statistics summary read back from the metrics registry

pub mod daily_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use daily_stats::{DailyStatsReporter, InstrumentDailyStats};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;

//! Adaptive band controller, interval counters and entry signals.
//!
//! Everything here is pure and synchronous: the orchestration loop owns the
//! state and threads it through these functions once per cycle.
//!
//! - `band`: four adaptive open bands and the open counts that drive them
//! - `counters`: eight monotonic daily-change bin counters
//! - `signal`: long/short entry decisions
//! - `gate`: optional predictive veto over entry signals
//! - `sleep_window`: inter-cycle pacing

pub mod band;
pub mod config;
pub mod counters;
pub mod error;
pub mod gate;
pub mod signal;
pub mod sleep_window;

pub use band::{
    adjust_after_long_open, adjust_after_short_open, adjust_for_frequency, Band, BandLimits,
    BandState,
};
pub use config::StrategyConfig;
pub use counters::{BinEdges, IntervalCounters};
pub use error::{StrategyError, StrategyResult};
pub use gate::{
    train_centroid_model, CentroidModel, FeatureVector, LabeledSample, ModelSlot, PredictiveGate,
    TrainingReport,
};
pub use signal::{evaluate_entry, long_signal, short_signal, SignalInputs};
pub use sleep_window::{modulate, SleepWindow};

//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use bandbot_core::InstrumentId;
use bandbot_gateway::{PaperConfig, OKX_BASE_URL};
use bandbot_risk::{ExitConfig, RiskConfig};
use bandbot_strategy::{SleepWindow, StrategyConfig};

use crate::error::{AppError, AppResult};
use crate::retry::RetryPolicy;

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Full loop against the simulated account.
    #[default]
    Paper,
    /// Loop runs and records, but no order ever leaves the process.
    Observation,
}

// ============================================================================
// Sections
// ============================================================================

/// Initial inter-cycle sleep window, seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_window_start")]
    pub initial_start_secs: u64,
    #[serde(default = "default_window_end")]
    pub initial_end_secs: u64,
}

fn default_window_start() -> u64 {
    SleepWindow::default().start
}

fn default_window_end() -> u64 {
    SleepWindow::default().end
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            initial_start_secs: default_window_start(),
            initial_end_secs: default_window_end(),
        }
    }
}

impl PacingConfig {
    #[must_use]
    pub fn initial_window(&self) -> SleepWindow {
        SleepWindow::new(self.initial_start_secs, self.initial_end_secs)
    }
}

/// Retry budgets and delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive cycle failures retried before shutdown.
    #[serde(default = "default_cycle_failure_limit")]
    pub cycle_failure_limit: u32,
    #[serde(default = "default_cycle_retry_delay_secs")]
    pub cycle_retry_delay_secs: u64,
    /// Retries for each day-rollover step.
    #[serde(default = "default_rollover_retries")]
    pub rollover_retries: u32,
    #[serde(default = "default_rollover_retry_delay_secs")]
    pub rollover_retry_delay_secs: u64,
    /// Fixed backoff for bootstrap resources (retried indefinitely).
    #[serde(default = "default_bootstrap_retry_delay_secs")]
    pub bootstrap_retry_delay_secs: u64,
    /// Polls of the realized pnl after a close.
    #[serde(default = "default_pnl_settle_polls")]
    pub pnl_settle_polls: u32,
    #[serde(default = "default_pnl_settle_delay_secs")]
    pub pnl_settle_delay_secs: u64,
    /// Retries for a failed shipper write.
    #[serde(default = "default_worker_retries")]
    pub worker_retries: u32,
    #[serde(default = "default_worker_retry_delay_secs")]
    pub worker_retry_delay_secs: u64,
}

fn default_cycle_failure_limit() -> u32 {
    3
}

fn default_cycle_retry_delay_secs() -> u64 {
    10
}

fn default_rollover_retries() -> u32 {
    3
}

fn default_rollover_retry_delay_secs() -> u64 {
    5
}

fn default_bootstrap_retry_delay_secs() -> u64 {
    5
}

fn default_pnl_settle_polls() -> u32 {
    5
}

fn default_pnl_settle_delay_secs() -> u64 {
    3
}

fn default_worker_retries() -> u32 {
    3
}

fn default_worker_retry_delay_secs() -> u64 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            cycle_failure_limit: default_cycle_failure_limit(),
            cycle_retry_delay_secs: default_cycle_retry_delay_secs(),
            rollover_retries: default_rollover_retries(),
            rollover_retry_delay_secs: default_rollover_retry_delay_secs(),
            bootstrap_retry_delay_secs: default_bootstrap_retry_delay_secs(),
            pnl_settle_polls: default_pnl_settle_polls(),
            pnl_settle_delay_secs: default_pnl_settle_delay_secs(),
            worker_retries: default_worker_retries(),
            worker_retry_delay_secs: default_worker_retry_delay_secs(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn rollover_policy(&self) -> RetryPolicy {
        RetryPolicy::bounded(
            self.rollover_retries,
            Duration::from_secs(self.rollover_retry_delay_secs),
        )
    }

    #[must_use]
    pub fn bootstrap_policy(&self) -> RetryPolicy {
        RetryPolicy::forever(Duration::from_secs(self.bootstrap_retry_delay_secs))
    }

    #[must_use]
    pub fn worker_policy(&self) -> RetryPolicy {
        RetryPolicy::bounded(
            self.worker_retries,
            Duration::from_secs(self.worker_retry_delay_secs),
        )
    }

    #[must_use]
    pub fn cycle_retry_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_retry_delay_secs)
    }

    #[must_use]
    pub fn pnl_settle_delay(&self) -> Duration {
        Duration::from_secs(self.pnl_settle_delay_secs)
    }
}

/// File locations and shipping cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Daily `cycles_YYYY-MM-DD.jsonl` files.
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,
    /// Daily `events_YYYY-MM-DD.jsonl` files.
    #[serde(default = "default_events_dir")]
    pub events_dir: PathBuf,
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,
    #[serde(default = "default_batch_size")]
    pub record_batch: usize,
    #[serde(default = "default_batch_size")]
    pub event_batch: usize,
    #[serde(default = "default_ship_interval_secs")]
    pub record_ship_interval_secs: u64,
    #[serde(default = "default_ship_interval_secs")]
    pub event_ship_interval_secs: u64,
    /// Capacity of the record and event queues.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on the final drain at shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/state.json")
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("data/records")
}

fn default_events_dir() -> PathBuf {
    PathBuf::from("data/events")
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("data/daily_close.jsonl")
}

fn default_batch_size() -> usize {
    50
}

fn default_ship_interval_secs() -> u64 {
    5
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_drain_timeout_secs() -> u64 {
    10
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            records_dir: default_records_dir(),
            events_dir: default_events_dir(),
            archive_path: default_archive_path(),
            record_batch: default_batch_size(),
            event_batch: default_batch_size(),
            record_ship_interval_secs: default_ship_interval_secs(),
            event_ship_interval_secs: default_ship_interval_secs(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

/// External run/stop switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(default = "default_switch_path")]
    pub path: PathBuf,
    #[serde(default = "default_switch_poll_secs")]
    pub poll_interval_secs: u64,
}

fn default_switch_path() -> PathBuf {
    PathBuf::from("data/switch")
}

fn default_switch_poll_secs() -> u64 {
    5
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            path: default_switch_path(),
            poll_interval_secs: default_switch_poll_secs(),
        }
    }
}

/// Operator alerts. Without a webhook alerts only go to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_alert_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_alert_timeout_secs() -> u64 {
    10
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_alert_timeout_secs(),
        }
    }
}

/// Predictive gate retraining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_enabled")]
    pub enabled: bool,
    #[serde(default = "default_retrain_interval_secs")]
    pub retrain_interval_secs: u64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_model_enabled() -> bool {
    true
}

fn default_retrain_interval_secs() -> u64 {
    3600
}

fn default_min_samples() -> usize {
    30
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: default_model_enabled(),
            retrain_interval_secs: default_retrain_interval_secs(),
            min_samples: default_min_samples(),
        }
    }
}

/// Public market data endpoint and the cross-asset index basket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_index_instruments")]
    pub index_instruments: Vec<String>,
}

fn default_base_url() -> String {
    OKX_BASE_URL.to_string()
}

fn default_index_instruments() -> Vec<String> {
    ["BTC-USDT-SWAP", "SOL-USDT-SWAP", "ETH-USDT-SWAP", "DOGE-USDT-SWAP"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            index_instruments: default_index_instruments(),
        }
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Operating mode.
    #[serde(default)]
    pub mode: OperatingMode,
    /// Traded instrument.
    #[serde(default = "default_instrument")]
    pub instrument: String,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Bands, counters and entry signals.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Take-profit thresholds.
    #[serde(default)]
    pub exit: ExitConfig,
    /// Order sizing, position cap and stop-loss.
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub switch: SwitchConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Simulated account settings (paper and observation modes).
    #[serde(default)]
    pub paper: PaperConfig,
}

fn default_instrument() -> String {
    "ETH-USDT-SWAP".to_string()
}

fn default_leverage() -> u32 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            instrument: default_instrument(),
            leverage: default_leverage(),
            strategy: StrategyConfig::default(),
            exit: ExitConfig::default(),
            risk: RiskConfig::default(),
            pacing: PacingConfig::default(),
            retry: RetryConfig::default(),
            persistence: PersistenceConfig::default(),
            switch: SwitchConfig::default(),
            alert: AlertConfig::default(),
            model: ModelConfig::default(),
            market_data: MarketDataConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `BANDBOT_CONFIG` or the default path.
    ///
    /// A missing file falls back to defaults with a warning.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("BANDBOT_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_or_default(&config_path)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values.
    pub fn validate(&self) -> AppResult<()> {
        if self.instrument.trim().is_empty() {
            return Err(AppError::Config("instrument must not be empty".to_string()));
        }
        if self.leverage == 0 {
            return Err(AppError::Config("leverage must be at least 1".to_string()));
        }

        self.strategy.validate()?;
        self.risk.validate()?;

        if self.exit.take_profit_floor <= 0.0 {
            return Err(AppError::Config(format!(
                "exit.take_profit_floor ({}) must be positive",
                self.exit.take_profit_floor
            )));
        }
        if self.exit.extreme_move <= self.exit.take_profit_floor {
            return Err(AppError::Config(format!(
                "exit.extreme_move ({}) must exceed take_profit_floor ({})",
                self.exit.extreme_move, self.exit.take_profit_floor
            )));
        }

        let window = SleepWindow {
            start: self.pacing.initial_start_secs,
            end: self.pacing.initial_end_secs,
        };
        if !window.is_valid() {
            return Err(AppError::Config(format!(
                "pacing window ({}, {}) is out of range",
                self.pacing.initial_start_secs, self.pacing.initial_end_secs
            )));
        }

        if self.retry.pnl_settle_polls == 0 {
            return Err(AppError::Config(
                "retry.pnl_settle_polls must be at least 1".to_string(),
            ));
        }

        let p = &self.persistence;
        if p.record_batch == 0 || p.event_batch == 0 || p.queue_capacity == 0 {
            return Err(AppError::Config(
                "persistence batch sizes and queue capacity must be positive".to_string(),
            ));
        }
        if p.record_ship_interval_secs == 0 || p.event_ship_interval_secs == 0 {
            return Err(AppError::Config(
                "persistence ship intervals must be positive".to_string(),
            ));
        }

        if self.switch.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "switch.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.model.enabled && self.model.retrain_interval_secs == 0 {
            return Err(AppError::Config(
                "model.retrain_interval_secs must be positive".to_string(),
            ));
        }
        if let Some(url) = &self.alert.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "alert.webhook_url must be http(s): {url}"
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        InstrumentId::new(self.instrument.clone())
    }

    #[must_use]
    pub fn index_instruments(&self) -> Vec<InstrumentId> {
        self.market_data
            .index_instruments
            .iter()
            .map(InstrumentId::new)
            .collect()
    }

    /// Check if in observation mode.
    #[must_use]
    pub fn is_observation_mode(&self) -> bool {
        self.mode == OperatingMode::Observation
    }
}

//! Engine harness over the paper exchange and a temp directory.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use tokio::sync::mpsc;

use bandbot::{AppConfig, Engine, EngineChannels, EngineDeps, OperatingMode};
use bandbot_core::InstrumentId;
use bandbot_gateway::{
    ExchangeGateway, FileSwitch, LogAlertSink, MarketDataSource, ObservationExchange, PaperConfig,
    PaperExchange,
};
use bandbot_persistence::{CycleRecord, EventRecord};
use bandbot_risk::ShutdownLatch;
use bandbot_strategy::ModelSlot;

use super::market::{ticker, FlakyMarketData};

pub const TRADED: &str = "ETH-USDT-SWAP";
pub const INDEX: &str = "BTC-USDT-SWAP";

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
}

pub fn traded() -> InstrumentId {
    InstrumentId::new(TRADED)
}

pub fn index() -> InstrumentId {
    InstrumentId::new(INDEX)
}

/// Config rooted in `dir` with no retry delays and a flat one-asset index.
pub fn test_config(dir: &TempDir, mode: OperatingMode) -> AppConfig {
    let root = dir.path();
    let mut config = AppConfig {
        mode,
        instrument: TRADED.to_string(),
        ..AppConfig::default()
    };
    config.market_data.index_instruments = vec![INDEX.to_string()];

    config.persistence.snapshot_path = root.join("state.json");
    config.persistence.records_dir = root.join("records");
    config.persistence.events_dir = root.join("events");
    config.persistence.archive_path = root.join("daily_close.jsonl");
    config.persistence.record_ship_interval_secs = 1;
    config.persistence.event_ship_interval_secs = 1;
    config.switch.path = root.join("switch");
    config.switch.poll_interval_secs = 1;

    config.retry.cycle_retry_delay_secs = 0;
    config.retry.rollover_retry_delay_secs = 0;
    config.retry.bootstrap_retry_delay_secs = 0;
    config.retry.pnl_settle_delay_secs = 0;
    config.retry.worker_retry_delay_secs = 0;
    config
}

pub struct Harness {
    pub dir: TempDir,
    pub config: AppConfig,
    pub market: Arc<FlakyMarketData>,
    pub paper: Arc<PaperExchange>,
    pub deps: EngineDeps,
    pub records: mpsc::Receiver<CycleRecord>,
    pub events: mpsc::Receiver<EventRecord>,
    channels: EngineChannels,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_mode(OperatingMode::Paper)
    }

    pub fn with_mode(mode: OperatingMode) -> Self {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, mode);

        let market = Arc::new(FlakyMarketData::new());
        // Flat index: its trend never blocks an entry.
        market.push(ticker(&index(), dec!(100), dec!(100)));

        let paper = Arc::new(PaperExchange::new(
            market.clone() as Arc<dyn MarketDataSource>,
            PaperConfig::default(),
        ));
        let exchange: Arc<dyn ExchangeGateway> = match mode {
            OperatingMode::Paper => paper.clone(),
            OperatingMode::Observation => Arc::new(ObservationExchange::new(paper.clone())),
        };

        let deps = EngineDeps {
            exchange,
            market_data: market.clone(),
            switch: Arc::new(FileSwitch::new(config.switch.path.clone())),
            alerts: Arc::new(LogAlertSink),
            gate: Arc::new(ModelSlot::new()),
            latch: Arc::new(ShutdownLatch::new()),
        };

        let (records_tx, records) = mpsc::channel(256);
        let (events_tx, events) = mpsc::channel(256);

        Self {
            dir,
            config,
            market,
            paper,
            deps,
            records,
            events,
            channels: EngineChannels {
                records: records_tx,
                events: events_tx,
            },
        }
    }

    /// A fresh engine sharing this harness' exchange, files and queues.
    pub fn engine(&self) -> Engine {
        Engine::new(self.config.clone(), self.deps.clone(), self.channels.clone())
    }

    /// Bootstrapped engine.
    pub async fn started_engine(&self) -> Engine {
        let mut engine = self.engine();
        engine.bootstrap().await.unwrap();
        engine
    }

    pub fn latch(&self) -> Arc<ShutdownLatch> {
        self.deps.latch.clone()
    }

    /// Queue the next traded-instrument ticker.
    pub fn push_price(&self, last: Decimal, reference_close: Decimal) {
        self.market.push(ticker(&traded(), last, reference_close));
    }

    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn drain_records(&mut self) -> Vec<CycleRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.records.try_recv() {
            records.push(record);
        }
        records
    }
}

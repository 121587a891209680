//! Application wiring.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use bandbot_gateway::{
    AlertSink, ExchangeGateway, FileSwitch, LogAlertSink, MarketDataSource, ObservationExchange,
    OkxMarketData, PaperExchange, ShutdownSwitch, WebhookAlertSink,
};
use bandbot_persistence::{CycleRecord, EventRecord, JsonLinesWriter};
use bandbot_risk::{ShutdownLatch, ShutdownReason};
use bandbot_strategy::ModelSlot;

use crate::config::{AppConfig, OperatingMode};
use crate::engine::{Engine, EngineChannels, EngineDeps};
use crate::error::{AppError, AppResult};
use crate::workers::{
    spawn_model_retrainer, spawn_shipper, spawn_switch_poller, ShipperSettings, EVENTS_PREFIX,
    RECORDS_PREFIX,
};

/// Main application.
pub struct Application {
    config: AppConfig,
    deps: EngineDeps,
}

impl Application {
    /// Build the collaborators for the configured mode.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let market_data: Arc<dyn MarketDataSource> =
            Arc::new(OkxMarketData::new(config.market_data.base_url.clone())?);
        let paper: Arc<dyn ExchangeGateway> =
            Arc::new(PaperExchange::new(market_data.clone(), config.paper.clone()));
        let exchange: Arc<dyn ExchangeGateway> = match config.mode {
            OperatingMode::Paper => paper,
            OperatingMode::Observation => Arc::new(ObservationExchange::new(paper)),
        };

        let alerts: Arc<dyn AlertSink> = match &config.alert.webhook_url {
            Some(url) => Arc::new(WebhookAlertSink::new(
                url.clone(),
                Duration::from_secs(config.alert.timeout_secs),
            )?),
            None => Arc::new(LogAlertSink),
        };

        let switch: Arc<dyn ShutdownSwitch> = Arc::new(FileSwitch::new(config.switch.path.clone()));

        let deps = EngineDeps {
            exchange,
            market_data,
            switch,
            alerts,
            gate: Arc::new(ModelSlot::new()),
            latch: Arc::new(ShutdownLatch::new()),
        };

        Ok(Self::with_deps(config, deps))
    }

    /// Use prebuilt collaborators.
    pub fn with_deps(config: AppConfig, deps: EngineDeps) -> Self {
        Self { config, deps }
    }

    #[must_use]
    pub fn latch(&self) -> Arc<ShutdownLatch> {
        self.deps.latch.clone()
    }

    /// Run until shutdown, then wait for every worker to finish.
    pub async fn run(self) -> AppResult<()> {
        let Self { config, deps } = self;
        info!(
            mode = ?config.mode,
            instrument = %config.instrument,
            leverage = config.leverage,
            "Starting application"
        );

        let persistence = &config.persistence;
        let (records_tx, records_rx) = mpsc::channel::<CycleRecord>(persistence.queue_capacity);
        let (events_tx, events_rx) = mpsc::channel::<EventRecord>(persistence.queue_capacity);

        let worker_retry = config.retry.worker_policy();
        let drain_timeout = Duration::from_secs(persistence.drain_timeout_secs);
        let mut workers: Vec<JoinHandle<()>> = vec![
            spawn_shipper(
                ShipperSettings {
                    name: "record_shipper",
                    batch: persistence.record_batch,
                    interval: Duration::from_secs(persistence.record_ship_interval_secs),
                    drain_timeout,
                    retry: worker_retry,
                },
                records_rx,
                JsonLinesWriter::new(
                    persistence.records_dir.clone(),
                    RECORDS_PREFIX,
                    persistence.record_batch,
                ),
                deps.latch.clone(),
                deps.alerts.clone(),
            ),
            spawn_shipper(
                ShipperSettings {
                    name: "event_shipper",
                    batch: persistence.event_batch,
                    interval: Duration::from_secs(persistence.event_ship_interval_secs),
                    drain_timeout,
                    retry: worker_retry,
                },
                events_rx,
                JsonLinesWriter::new(
                    persistence.events_dir.clone(),
                    EVENTS_PREFIX,
                    persistence.event_batch,
                ),
                deps.latch.clone(),
                deps.alerts.clone(),
            ),
        ];

        if config.model.enabled {
            workers.push(spawn_model_retrainer(
                persistence.records_dir.clone(),
                config.model.min_samples,
                Duration::from_secs(config.model.retrain_interval_secs),
                deps.gate.clone(),
                deps.latch.clone(),
                deps.alerts.clone(),
            ));
        }

        let interrupt_latch = deps.latch.clone();
        let interrupt = tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => {
                            interrupt_latch.trigger(ShutdownReason::Interrupted);
                        }
                        Err(e) => warn!(?e, "Failed to listen for Ctrl-C"),
                    }
                }
                () = interrupt_latch.cancelled() => {}
            }
        });

        let switch = deps.switch.clone();
        let poll_interval = Duration::from_secs(config.switch.poll_interval_secs);
        let latch = deps.latch.clone();
        let alerts = deps.alerts.clone();

        let mut engine = Engine::new(
            config,
            deps,
            EngineChannels {
                records: records_tx,
                events: events_tx,
            },
        );

        // The switch exists once bootstrap is through; poll it from then on.
        let result = match engine.bootstrap().await {
            Ok(()) => {
                workers.push(spawn_switch_poller(switch, poll_interval, latch.clone(), alerts));
                engine.run().await
            }
            Err(AppError::Shutdown) => {
                engine.shutdown().await;
                Ok(())
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!(error = %e, "Engine stopped with error");
            latch.trigger(ShutdownReason::WorkerFailed {
                worker: "engine",
                detail: e.to_string(),
            });
        }
        // Closing the queues lets the shippers finish their final drain.
        drop(engine);

        interrupt.abort();
        for worker in workers {
            if let Err(e) = worker.await {
                error!(?e, "Worker task panicked");
            }
        }

        info!(reason = ?latch.reason(), "Application stopped");
        result
    }
}

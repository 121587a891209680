//! Side workers.
//!
//! Each worker is a spawned task that talks to the loop only through a queue
//! or the shared [`ModelSlot`], and stops at the next loop boundary once the
//! shutdown latch is triggered:
//! - record/event shippers: drain their queue into daily JSON Lines files
//! - switch poller: turns the external switch into a shutdown
//! - model retrainer: refits the predictive gate from the cycle history

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use bandbot_gateway::{notify, AlertSink, ShutdownSwitch};
use bandbot_persistence::{read_records, CycleRecord, JsonLinesWriter};
use bandbot_risk::{ShutdownLatch, ShutdownReason};
use bandbot_strategy::{train_centroid_model, ModelSlot, StrategyError};
use bandbot_telemetry::Metrics;

use crate::error::AppResult;
use crate::retry::{retry_async, RetryPolicy};
use crate::training::label_opens;

/// File prefix of the cycle record files.
pub const RECORDS_PREFIX: &str = "cycles";
/// File prefix of the event files.
pub const EVENTS_PREFIX: &str = "events";

// ============================================================================
// Shippers
// ============================================================================

/// Cadence and failure budget of one shipping worker.
#[derive(Debug, Clone, Copy)]
pub struct ShipperSettings {
    pub name: &'static str,
    /// Records written per interval while running.
    pub batch: usize,
    pub interval: Duration,
    /// Upper bound on the final drain.
    pub drain_timeout: Duration,
    pub retry: RetryPolicy,
}

/// Spawn a worker draining `rx` into `writer`.
///
/// While running it writes at most `batch` records per interval. Once the
/// latch is triggered it drains until every sender is gone (or the drain
/// timeout passes), writes, and exits. A write whose retries are cut short
/// by the latch is carried into that final drain. A write that still fails
/// after the retry budget alerts and shuts the process down.
pub fn spawn_shipper<T>(
    settings: ShipperSettings,
    mut rx: mpsc::Receiver<T>,
    mut writer: JsonLinesWriter<T>,
    latch: Arc<ShutdownLatch>,
    alerts: Arc<dyn AlertSink>,
) -> JoinHandle<()>
where
    T: Serialize + Send + 'static,
{
    tokio::spawn(async move {
        info!(worker = settings.name, "Shipper started");
        // Final writes still get their retries after the shared latch fired.
        let final_latch = ShutdownLatch::new();

        loop {
            let running = latch.sleep(settings.interval).await;

            let mut taken = 0usize;
            if running {
                while taken < settings.batch {
                    match rx.try_recv() {
                        Ok(record) => {
                            buffer(&mut writer, record, settings.name);
                            taken += 1;
                        }
                        Err(_) => break,
                    }
                }
            } else {
                let drain = async {
                    while let Some(record) = rx.recv().await {
                        buffer(&mut writer, record, settings.name);
                        taken += 1;
                    }
                };
                if tokio::time::timeout(settings.drain_timeout, drain).await.is_err() {
                    warn!(worker = settings.name, "Final drain timed out");
                }
            }

            let retry_latch = if running { latch.as_ref() } else { &final_latch };
            let pending = writer.pending();
            let written = retry_async(settings.retry, settings.name, retry_latch, || {
                std::future::ready(writer.flush())
            })
            .await;

            match written {
                Ok(()) => {
                    if pending > 0 {
                        Metrics::records_shipped(settings.name, pending);
                        debug!(worker = settings.name, records = pending, "Shipped");
                    }
                }
                Err(e) if e.is_cancelled() => {
                    // The latch is set, so the next pass is the final drain.
                    warn!(
                        worker = settings.name,
                        records = writer.pending(),
                        "Shutdown during write retry, keeping records for the final drain"
                    );
                    continue;
                }
                Err(e) => {
                    error!(worker = settings.name, error = %e, "Shipper write failed");
                    notify(
                        &alerts,
                        format!("bandbot {} failed", settings.name),
                        e.to_string(),
                    );
                    latch.trigger(ShutdownReason::WorkerFailed {
                        worker: settings.name,
                        detail: e.to_string(),
                    });
                    break;
                }
            }

            if !running {
                info!(worker = settings.name, drained = taken, "Shipper stopped");
                break;
            }
        }
    })
}

/// Queue a record in the writer; a failed early flush keeps it buffered.
fn buffer<T: Serialize>(writer: &mut JsonLinesWriter<T>, record: T, worker: &str) {
    if let Err(e) = writer.add_record(record) {
        warn!(worker, error = %e, "Early flush failed, records kept for retry");
    }
}

// ============================================================================
// Switch poller
// ============================================================================

/// Spawn the shutdown switch poller.
///
/// An `off` switch is an orderly stop; an unreadable one is fatal.
pub fn spawn_switch_poller(
    switch: Arc<dyn ShutdownSwitch>,
    interval: Duration,
    latch: Arc<ShutdownLatch>,
    alerts: Arc<dyn AlertSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while latch.sleep(interval).await {
            match switch.is_on().await {
                Ok(true) => debug!("Shutdown switch on"),
                Ok(false) => {
                    latch.trigger(ShutdownReason::SwitchOff);
                    break;
                }
                Err(e) => {
                    notify(&alerts, "bandbot switch unreadable", e.to_string());
                    latch.trigger(ShutdownReason::SwitchUnreadable {
                        detail: e.to_string(),
                    });
                    break;
                }
            }
        }
        debug!("Switch poller stopped");
    })
}

// ============================================================================
// Model retrainer
// ============================================================================

/// Refit the gate from the cycle history under `records_dir`.
///
/// Returns `true` if a new model was published. Too little or one-sided
/// history is not an error; the current model (or none) stays in place.
pub async fn retrain_once(
    records_dir: &Path,
    min_samples: usize,
    gate: &ModelSlot,
) -> AppResult<bool> {
    let dir = records_dir.to_path_buf();
    let records: Vec<CycleRecord> =
        tokio::task::spawn_blocking(move || read_records(&dir, RECORDS_PREFIX)).await??;
    let samples = label_opens(&records);

    match train_centroid_model(&samples, min_samples) {
        Ok(report) if report.beats_baseline() => {
            info!(
                train = report.train_len,
                test = report.test_len,
                accuracy = report.accuracy,
                baseline = report.baseline_accuracy,
                "Retrained predictive gate"
            );
            gate.publish(report.model);
            Metrics::model_loaded(true);
            Ok(true)
        }
        Ok(report) => {
            info!(
                accuracy = report.accuracy,
                baseline = report.baseline_accuracy,
                "Retrained model does not beat the baseline, keeping current gate"
            );
            Ok(false)
        }
        Err(StrategyError::InsufficientData { have, need }) => {
            debug!(have, need, "Not enough labeled opens to train");
            Ok(false)
        }
        Err(StrategyError::SingleClass) => {
            debug!("Labeled opens are one-sided, skipping training");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Spawn the periodic retrainer. The first fit runs immediately.
pub fn spawn_model_retrainer(
    records_dir: PathBuf,
    min_samples: usize,
    interval: Duration,
    gate: Arc<ModelSlot>,
    latch: Arc<ShutdownLatch>,
    alerts: Arc<dyn AlertSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        Metrics::model_loaded(gate.is_loaded());
        loop {
            if let Err(e) = retrain_once(&records_dir, min_samples, &gate).await {
                error!(error = %e, "Model retraining failed");
                notify(&alerts, "bandbot model retraining failed", e.to_string());
                latch.trigger(ShutdownReason::WorkerFailed {
                    worker: "model_retrainer",
                    detail: e.to_string(),
                });
                break;
            }
            if !latch.sleep(interval).await {
                break;
            }
        }
        debug!("Model retrainer stopped");
    })
}

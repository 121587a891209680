//! Daily statistics summary.
//!
//! Reads counters back from the metrics registry and logs what happened since
//! the previous summary:
//! - cycles completed and failed
//! - actions by trade type
//! - sleep distribution (mean, P50, P95)
//! - cumulative realized pnl

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use serde::Serialize;
use tracing::info;

use bandbot_core::TradeType;

use crate::metrics::{
    ACTIONS_TOTAL, CYCLES_TOTAL, CYCLE_FAILURES_TOTAL, REALIZED_PNL, SLEEP_SECONDS,
};

const ACTION_TYPES: [TradeType; 5] = [
    TradeType::OpenLong,
    TradeType::OpenShort,
    TradeType::TakeProfitLong,
    TradeType::TakeProfitShort,
    TradeType::StopLoss,
];

/// Statistics for one instrument over one reporting period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstrumentDailyStats {
    pub instrument: String,
    pub cycles: u64,
    pub failures: u64,
    /// Keyed by trade type label.
    pub actions: HashMap<String, u64>,
    pub sleep_mean_secs: f64,
    pub sleep_p50_secs: f64,
    pub sleep_p95_secs: f64,
    pub cumulative_profit: f64,
    pub cumulative_loss: f64,
}

/// Raw cumulative totals, used as the baseline for the next period.
#[derive(Debug, Clone, Default)]
struct Totals {
    cycles: u64,
    failures: u64,
    actions: HashMap<String, u64>,
}

/// Daily statistics reporter.
pub struct DailyStatsReporter {
    instruments: Vec<String>,
    start_time: DateTime<Utc>,
    baseline: HashMap<String, Totals>,
}

impl DailyStatsReporter {
    pub fn new(instruments: Vec<String>) -> Self {
        Self {
            instruments,
            start_time: Utc::now(),
            baseline: HashMap::new(),
        }
    }

    fn totals(instrument: &str) -> Totals {
        let failures = ["transient", "fatal"]
            .iter()
            .map(|kind| {
                CYCLE_FAILURES_TOTAL
                    .with_label_values(&[instrument, kind])
                    .get() as u64
            })
            .sum();
        let actions = ACTION_TYPES
            .iter()
            .map(|t| {
                let count = ACTIONS_TOTAL
                    .with_label_values(&[instrument, t.as_str()])
                    .get() as u64;
                (t.as_str().to_string(), count)
            })
            .collect();
        Totals {
            cycles: CYCLES_TOTAL.with_label_values(&[instrument]).get() as u64,
            failures,
            actions,
        }
    }

    /// Statistics since the last [`Self::output_daily_summary`] (or start).
    pub fn get_stats(&self) -> Vec<InstrumentDailyStats> {
        self.instruments
            .iter()
            .map(|instrument| self.instrument_stats(instrument))
            .collect()
    }

    fn instrument_stats(&self, instrument: &str) -> InstrumentDailyStats {
        let now = Self::totals(instrument);
        let base = self.baseline.get(instrument).cloned().unwrap_or_default();
        let actions = now
            .actions
            .iter()
            .map(|(k, v)| {
                let before = base.actions.get(k).copied().unwrap_or(0);
                (k.clone(), v.saturating_sub(before))
            })
            .collect();

        let (sleep_mean_secs, sleep_p50_secs, sleep_p95_secs) = sleep_summary(instrument);

        InstrumentDailyStats {
            instrument: instrument.to_string(),
            cycles: now.cycles.saturating_sub(base.cycles),
            failures: now.failures.saturating_sub(base.failures),
            actions,
            sleep_mean_secs,
            sleep_p50_secs,
            sleep_p95_secs,
            cumulative_profit: REALIZED_PNL
                .with_label_values(&[instrument, "profit"])
                .get(),
            cumulative_loss: REALIZED_PNL.with_label_values(&[instrument, "loss"]).get(),
        }
    }

    /// Log the summary and start a new period.
    pub fn output_daily_summary(&mut self) {
        let stats = self.get_stats();
        let duration = Utc::now() - self.start_time;

        info!("========== Daily Statistics Summary ==========");
        info!(
            "Period: {} ({} hours {} minutes)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            duration.num_hours(),
            duration.num_minutes() % 60
        );

        for s in &stats {
            info!("--- {} ---", s.instrument);
            info!("  Cycles: {} (failed: {})", s.cycles, s.failures);
            for t in ACTION_TYPES {
                info!(
                    "  {}: {}",
                    t.as_str(),
                    s.actions.get(t.as_str()).copied().unwrap_or(0)
                );
            }
            info!(
                "  Sleep (s): mean={:.1}, P50={:.1}, P95={:.1}",
                s.sleep_mean_secs, s.sleep_p50_secs, s.sleep_p95_secs
            );
            info!(
                "  Realized pnl: profit={:.4}, loss={:.4}",
                s.cumulative_profit, s.cumulative_loss
            );
        }

        info!("==============================================");

        self.baseline = self
            .instruments
            .iter()
            .map(|i| (i.clone(), Self::totals(i)))
            .collect();
        self.start_time = Utc::now();
    }
}

/// Mean, P50 and P95 of the sleep histogram over the process lifetime.
fn sleep_summary(instrument: &str) -> (f64, f64, f64) {
    for mf in SLEEP_SECONDS.collect() {
        for m in mf.get_metric() {
            let matches = m
                .get_label()
                .iter()
                .any(|pair| pair.get_name() == "instrument" && pair.get_value() == instrument);
            if !matches {
                continue;
            }

            let h = m.get_histogram();
            let count = h.get_sample_count();
            if count == 0 {
                return (0.0, 0.0, 0.0);
            }
            let buckets = h.get_bucket();
            return (
                h.get_sample_sum() / count as f64,
                percentile_from_buckets(buckets, count, 0.50),
                percentile_from_buckets(buckets, count, 0.95),
            );
        }
    }
    (0.0, 0.0, 0.0)
}

/// Linear interpolation inside the bucket holding the target rank.
fn percentile_from_buckets(
    buckets: &[prometheus::proto::Bucket],
    total_count: u64,
    percentile: f64,
) -> f64 {
    let target = (total_count as f64 * percentile).ceil() as u64;
    let mut prev_bound = 0.0;
    let mut prev_count = 0u64;

    for bucket in buckets {
        let upper_bound = bucket.get_upper_bound();
        let cumulative_count = bucket.get_cumulative_count();

        if cumulative_count >= target {
            let bucket_count = cumulative_count - prev_count;
            if bucket_count == 0 {
                return upper_bound;
            }
            let position = (target - prev_count) as f64 / bucket_count as f64;
            return prev_bound + position * (upper_bound - prev_bound);
        }

        prev_bound = upper_bound;
        prev_count = cumulative_count;
    }

    buckets.last().map(|b| b.get_upper_bound()).unwrap_or(0.0)
}

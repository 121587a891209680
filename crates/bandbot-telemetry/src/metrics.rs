//! Prometheus metrics for the band trader.
//!
//! Covers:
//! - Orchestration cycles and failures
//! - Order actions by trade type
//! - Adaptive state (bands, open counts, interval counters, sizing)
//! - Pacing and realized pnl
//! - Side-worker activity
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_gauge,
    CounterVec, GaugeVec, HistogramVec, IntGauge,
};

use bandbot_core::{Side, TradeType};

// ============================================================================
// Cycles
// ============================================================================

/// Completed orchestration cycles.
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_cycles_total",
        "Completed orchestration cycles",
        &["instrument"]
    )
    .unwrap()
});

/// Failed cycles.
/// Labels: kind (transient/fatal)
pub static CYCLE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_cycle_failures_total",
        "Failed orchestration cycles",
        &["instrument", "kind"]
    )
    .unwrap()
});

/// Daily change against the reference close.
pub static DAILY_PCT: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bandbot_daily_pct",
        "Price change against the previous day's close",
        &["instrument"]
    )
    .unwrap()
});

/// Sleep between cycles in seconds.
pub static SLEEP_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "bandbot_sleep_seconds",
        "Inter-cycle sleep in seconds",
        &["instrument"],
        vec![2.0, 4.0, 6.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0, 100.0]
    )
    .unwrap()
});

// ============================================================================
// Actions
// ============================================================================

/// Order actions taken.
/// Labels: trade_type (open_long/open_short/take_profit_long/...)
pub static ACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_actions_total",
        "Order actions taken",
        &["instrument", "trade_type"]
    )
    .unwrap()
});

/// Entry signals vetoed by the predictive gate.
pub static GATE_VETO_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_gate_veto_total",
        "Entry signals vetoed by the predictive gate",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Opens skipped because the position cap was reached.
pub static CAP_BLOCKED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_cap_blocked_total",
        "Opens skipped at the position value cap",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Orders or closes that the exchange did not accept.
pub static ORDER_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_order_failures_total",
        "Orders or closes not accepted by the exchange",
        &["instrument", "action"]
    )
    .unwrap()
});

// ============================================================================
// Adaptive state
// ============================================================================

/// Band bounds.
/// Labels: side (long/short), bound (down/up)
pub static BAND_BOUND: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bandbot_band_bound",
        "Current band bound",
        &["instrument", "side", "bound"]
    )
    .unwrap()
});

/// Open counts since the last reset.
pub static OPEN_COUNT: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bandbot_open_count",
        "Same-direction opens since the last reset",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Interval counters.
/// Labels: direction (up/down), bin (1..4)
pub static INTERVAL_COUNTER: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bandbot_interval_counter",
        "Interval counter value",
        &["instrument", "direction", "bin"]
    )
    .unwrap()
});

/// Order size in contract units.
pub static ORDER_SIZE_UNITS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bandbot_order_size_units",
        "Current order size in contract units",
        &["instrument"]
    )
    .unwrap()
});

/// Cumulative realized pnl.
/// Labels: kind (profit/loss)
pub static REALIZED_PNL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bandbot_realized_pnl",
        "Cumulative realized pnl",
        &["instrument", "kind"]
    )
    .unwrap()
});

// ============================================================================
// Workers
// ============================================================================

/// Records written by shipping workers.
pub static RECORDS_SHIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_records_shipped_total",
        "Records written by shipping workers",
        &["sink"]
    )
    .unwrap()
});

/// Retried operations.
pub static RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bandbot_retries_total",
        "Retried operations",
        &["operation"]
    )
    .unwrap()
});

/// Predictive model loaded (1) or absent (0).
pub static MODEL_LOADED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "bandbot_model_loaded",
        "Predictive model loaded (1) or absent (0)"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a completed cycle.
    pub fn cycle_completed(instrument: &str) {
        CYCLES_TOTAL.with_label_values(&[instrument]).inc();
    }

    /// Record a failed cycle.
    pub fn cycle_failed(instrument: &str, transient: bool) {
        let kind = if transient { "transient" } else { "fatal" };
        CYCLE_FAILURES_TOTAL
            .with_label_values(&[instrument, kind])
            .inc();
    }

    pub fn daily_pct(instrument: &str, pct: f64) {
        DAILY_PCT.with_label_values(&[instrument]).set(pct);
    }

    pub fn sleep(instrument: &str, secs: f64) {
        SLEEP_SECONDS.with_label_values(&[instrument]).observe(secs);
    }

    /// Record the cycle's action. `TradeType::None` is not counted.
    pub fn action(instrument: &str, trade_type: TradeType) {
        if trade_type.is_action() {
            ACTIONS_TOTAL
                .with_label_values(&[instrument, trade_type.as_str()])
                .inc();
        }
    }

    pub fn gate_veto(instrument: &str, side: Side) {
        GATE_VETO_TOTAL
            .with_label_values(&[instrument, side.as_str()])
            .inc();
    }

    pub fn cap_blocked(instrument: &str, side: Side) {
        CAP_BLOCKED_TOTAL
            .with_label_values(&[instrument, side.as_str()])
            .inc();
    }

    pub fn order_failed(instrument: &str, action: &str) {
        ORDER_FAILURES_TOTAL
            .with_label_values(&[instrument, action])
            .inc();
    }

    /// Publish both bounds of a band.
    pub fn band(instrument: &str, side: Side, down: f64, up: f64) {
        BAND_BOUND
            .with_label_values(&[instrument, side.as_str(), "down"])
            .set(down);
        BAND_BOUND
            .with_label_values(&[instrument, side.as_str(), "up"])
            .set(up);
    }

    pub fn open_count(instrument: &str, side: Side, count: u32) {
        OPEN_COUNT
            .with_label_values(&[instrument, side.as_str()])
            .set(f64::from(count));
    }

    /// Publish all eight interval counters.
    pub fn interval_counters(instrument: &str, up: &[u32; 4], down: &[u32; 4]) {
        for (i, (u, d)) in up.iter().zip(down).enumerate() {
            let bin = (i + 1).to_string();
            INTERVAL_COUNTER
                .with_label_values(&[instrument, "up", &bin])
                .set(f64::from(*u));
            INTERVAL_COUNTER
                .with_label_values(&[instrument, "down", &bin])
                .set(f64::from(*d));
        }
    }

    pub fn order_size(instrument: &str, units: u32) {
        ORDER_SIZE_UNITS
            .with_label_values(&[instrument])
            .set(f64::from(units));
    }

    pub fn realized_pnl(instrument: &str, cumulative_profit: f64, cumulative_loss: f64) {
        REALIZED_PNL
            .with_label_values(&[instrument, "profit"])
            .set(cumulative_profit);
        REALIZED_PNL
            .with_label_values(&[instrument, "loss"])
            .set(cumulative_loss);
    }

    pub fn records_shipped(sink: &str, count: usize) {
        RECORDS_SHIPPED_TOTAL
            .with_label_values(&[sink])
            .inc_by(count as f64);
    }

    pub fn retry(operation: &str) {
        RETRIES_TOTAL.with_label_values(&[operation]).inc();
    }

    pub fn model_loaded(loaded: bool) {
        MODEL_LOADED.set(i64::from(loaded));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_none_not_counted() {
        let inst = "TEST-ACTION-SWAP";
        Metrics::action(inst, TradeType::None);
        Metrics::action(inst, TradeType::OpenLong);
        Metrics::action(inst, TradeType::OpenLong);

        assert_eq!(
            ACTIONS_TOTAL
                .with_label_values(&[inst, "open_long"])
                .get(),
            2.0
        );
        assert_eq!(ACTIONS_TOTAL.with_label_values(&[inst, "none"]).get(), 0.0);
    }

    #[test]
    fn test_interval_counter_labels() {
        let inst = "TEST-COUNTER-SWAP";
        Metrics::interval_counters(inst, &[1, 2, 3, 4], &[5, 6, 7, 8]);
        assert_eq!(
            INTERVAL_COUNTER
                .with_label_values(&[inst, "up", "3"])
                .get(),
            3.0
        );
        assert_eq!(
            INTERVAL_COUNTER
                .with_label_values(&[inst, "down", "4"])
                .get(),
            8.0
        );
    }

    #[test]
    fn test_band_gauges() {
        let inst = "TEST-BAND-SWAP";
        Metrics::band(inst, Side::Short, 0.0015, 0.0055);
        assert_eq!(
            BAND_BOUND
                .with_label_values(&[inst, "short", "up"])
                .get(),
            0.0055
        );
    }
}

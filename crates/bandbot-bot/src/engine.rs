//! Orchestration loop.
//!
//! One sequential worker owns every piece of adaptive state. Each cycle:
//! 1. rolls the trading day over when the date changed
//! 2. reads the ticker, the cross-asset index and the held position
//! 3. updates the interval counters
//! 4. takes at most one order action, in priority
//!    open-long, open-short, take-profit, stop-loss
//! 5. applies the resulting band/risk update
//! 6. persists the snapshot and queues the cycle record
//! 7. sleeps a duration drawn from the modulated window
//!
//! A failed cycle leaves the in-memory state untouched and is retried after a
//! fixed delay; one failure past the budget alerts, persists and shuts down.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use bandbot_core::{CycleState, InstrumentId, MarketSnapshot, PositionInfo, Side, Ticker, TradeType};
use bandbot_gateway::{
    cross_asset_index, notify, AlertSink, CloseMode, CloseOutcome, ExchangeGateway,
    MarketDataSource, ShutdownSwitch,
};
use bandbot_persistence::{
    CycleRecord, DailyCloseArchive, DailyCloseRecord, EventRecord, LoadOutcome, SnapshotStore,
};
use bandbot_risk::{evaluate_take_profit, OpenDecision, ShutdownLatch, ShutdownReason, TakeProfit};
use bandbot_strategy::{
    adjust_after_long_open, adjust_after_short_open, adjust_for_frequency, evaluate_entry,
    long_signal, modulate, short_signal, FeatureVector, ModelSlot, SignalInputs,
};
use bandbot_telemetry::{DailyStatsReporter, Metrics};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::retry::{retry_async, RetryError};
use crate::state::EngineState;

/// Trading days start at 00:00 UTC+8, matching the exchange's reference close.
const TRADING_DAY_OFFSET_SECS: i32 = 8 * 3600;

/// Trading day containing `now`.
#[must_use]
pub fn trading_day(now: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(TRADING_DAY_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

// ============================================================================
// Phase
// ============================================================================

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Bootstrapping,
    DailyRollover,
    Acting,
    Persisting,
    Sleeping,
    ShuttingDown,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bootstrapping => "bootstrapping",
            Self::DailyRollover => "daily_rollover",
            Self::Acting => "acting",
            Self::Persisting => "persisting",
            Self::Sleeping => "sleeping",
            Self::ShuttingDown => "shutting_down",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Producer ends of the queues drained by the shipping workers.
#[derive(Debug, Clone)]
pub struct EngineChannels {
    pub records: mpsc::Sender<CycleRecord>,
    pub events: mpsc::Sender<EventRecord>,
}

/// External collaborators of the loop.
#[derive(Clone)]
pub struct EngineDeps {
    pub exchange: Arc<dyn ExchangeGateway>,
    pub market_data: Arc<dyn MarketDataSource>,
    pub switch: Arc<dyn ShutdownSwitch>,
    pub alerts: Arc<dyn AlertSink>,
    pub gate: Arc<ModelSlot>,
    pub latch: Arc<ShutdownLatch>,
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub trade_type: TradeType,
    pub record: CycleRecord,
    pub sleep: Duration,
}

/// What the action step decided, before it is committed.
struct ActionOutcome {
    trade_type: TradeType,
    events: Vec<EventRecord>,
}

impl ActionOutcome {
    fn none() -> Self {
        Self {
            trade_type: TradeType::None,
            events: Vec::new(),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The orchestration worker.
pub struct Engine {
    config: AppConfig,
    instrument: InstrumentId,
    index_instruments: Vec<InstrumentId>,
    deps: EngineDeps,
    channels: EngineChannels,
    store: SnapshotStore,
    archive: DailyCloseArchive,
    state: EngineState,
    cycle: CycleState,
    phase: EnginePhase,
    consecutive_failures: u32,
    /// State came from the snapshot (or defaults) and may be persisted.
    bootstrapped: bool,
    rolled_over_on: Option<NaiveDate>,
    stats: DailyStatsReporter,
}

impl Engine {
    pub fn new(config: AppConfig, deps: EngineDeps, channels: EngineChannels) -> Self {
        let instrument = config.instrument_id();
        let index_instruments = config.index_instruments();
        let store = SnapshotStore::new(config.persistence.snapshot_path.clone());
        let archive = DailyCloseArchive::new(config.persistence.archive_path.clone());
        let state = EngineState::defaults(
            &config.strategy.band,
            &config.risk,
            config.pacing.initial_window(),
            None,
        );
        let stats = DailyStatsReporter::new(vec![config.instrument.clone()]);

        Self {
            config,
            instrument,
            index_instruments,
            deps,
            channels,
            store,
            archive,
            state,
            cycle: CycleState::new(),
            phase: EnginePhase::Bootstrapping,
            consecutive_failures: 0,
            bootstrapped: false,
            rolled_over_on: None,
            stats,
        }
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn enter(&mut self, phase: EnginePhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "Engine phase");
            self.phase = phase;
        }
    }

    async fn emit(&self, event: EventRecord) {
        if self.channels.events.send(event).await.is_err() {
            warn!("Event queue closed, dropping event");
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Run until the shutdown latch is triggered. Bootstraps first unless
    /// [`Self::bootstrap`] already ran.
    pub async fn run(&mut self) -> AppResult<()> {
        if !self.bootstrapped {
            match self.bootstrap().await {
                Ok(()) => {}
                Err(AppError::Shutdown) => {
                    self.shutdown().await;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        while !self.deps.latch.is_triggered() {
            let today = trading_day(Utc::now());
            match self.run_cycle_on(today).await {
                Ok(report) => {
                    self.enter(EnginePhase::Sleeping);
                    debug!(sleep_secs = report.sleep.as_secs(), "Sleeping");
                    if !self.deps.latch.sleep(report.sleep).await {
                        break;
                    }
                }
                Err(AppError::Shutdown) => break,
                Err(AppError::Rollover(detail)) => {
                    self.fail_fatal(ShutdownReason::RolloverFailed { detail });
                    break;
                }
                Err(e) => {
                    if !self.on_cycle_failure(e).await {
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Load persisted state and make sure the switch resource exists.
    ///
    /// Both are retried with a fixed backoff until they succeed or shutdown
    /// is requested.
    pub async fn bootstrap(&mut self) -> AppResult<()> {
        self.enter(EnginePhase::Bootstrapping);
        let policy = self.config.retry.bootstrap_policy();
        let latch = self.deps.latch.as_ref();

        let switch = self.deps.switch.as_ref();
        retry_async(policy, "ensure_switch", latch, move || switch.ensure_exists())
            .await
            .map_err(bootstrap_error)?;

        let store = &self.store;
        let outcome = retry_async(policy, "load_snapshot", latch, move || async move { store.load() })
            .await
            .map_err(bootstrap_error)?;

        let limits = self.config.strategy.band;
        let window = self.config.pacing.initial_window();
        match outcome {
            LoadOutcome::Loaded(snapshot) => {
                self.state =
                    EngineState::from_snapshot(&snapshot, &limits, &self.config.risk, window);
                info!(
                    trading_day = ?self.state.trading_day,
                    long_open_count = self.state.bands.long_open_count,
                    short_open_count = self.state.bands.short_open_count,
                    order_size_units = self.state.risk.order_size_units,
                    "Restored state snapshot"
                );
            }
            LoadOutcome::NotFound => {
                info!(path = %self.store.path().display(), "No state snapshot, starting from defaults");
                self.state = EngineState::defaults(&limits, &self.config.risk, window, None);
            }
            LoadOutcome::Malformed(detail) => {
                warn!(detail = %detail, "State snapshot unreadable, starting from defaults");
                self.state = EngineState::defaults(&limits, &self.config.risk, window, None);
                self.emit(EventRecord::error("State snapshot unreadable", detail))
                    .await;
            }
        }

        self.bootstrapped = true;
        Ok(())
    }

    /// Count a failed cycle. Returns `false` when the loop must stop.
    async fn on_cycle_failure(&mut self, err: AppError) -> bool {
        self.consecutive_failures += 1;
        Metrics::cycle_failed(self.instrument.as_str(), err.is_transient());
        error!(
            error = %err,
            consecutive_failures = self.consecutive_failures,
            limit = self.config.retry.cycle_failure_limit,
            "Cycle failed"
        );
        self.emit(EventRecord::error("Cycle failed", err.to_string()))
            .await;

        if self.consecutive_failures > self.config.retry.cycle_failure_limit {
            self.fail_fatal(ShutdownReason::CycleFailures {
                count: self.consecutive_failures,
                last_error: err.to_string(),
            });
            return false;
        }

        self.deps
            .latch
            .sleep(self.config.retry.cycle_retry_delay())
            .await
    }

    fn fail_fatal(&self, reason: ShutdownReason) {
        notify(
            &self.deps.alerts,
            format!("bandbot {} stopped", self.instrument),
            reason.to_string(),
        );
        self.deps.latch.trigger(reason);
    }

    /// Final persist and summary.
    pub async fn shutdown(&mut self) {
        self.enter(EnginePhase::ShuttingDown);
        if self.bootstrapped {
            if let Err(e) = self.store.save(&self.state.to_snapshot()) {
                error!(error = %e, "Final state persist failed");
            }
        }
        let reason = self
            .deps
            .latch
            .reason()
            .map_or_else(|| "loop exited".to_string(), |r| r.to_string());
        self.emit(EventRecord::info("Shutdown", reason)).await;
        self.stats.output_daily_summary();
        info!("Engine stopped");
    }

    // ------------------------------------------------------------------------
    // Cycle
    // ------------------------------------------------------------------------

    /// One full cycle for trading day `today`, without the sleep.
    pub async fn run_cycle_on(&mut self, today: NaiveDate) -> AppResult<CycleReport> {
        let ticker = if self.rolled_over_on == Some(today) {
            self.enter(EnginePhase::Acting);
            self.deps.exchange.get_ticker(&self.instrument).await?
        } else {
            self.enter(EnginePhase::DailyRollover);
            let ticker = self.rollover_ticker().await?;
            self.roll_over(today, &ticker).await?;
            self.enter(EnginePhase::Acting);
            ticker
        };

        let report = self.act(ticker).await?;

        self.enter(EnginePhase::Persisting);
        self.store.save(&self.state.to_snapshot())?;
        if self.channels.records.send(report.record.clone()).await.is_err() {
            return Err(AppError::QueueClosed("cycle records"));
        }
        self.consecutive_failures = 0;

        self.publish_metrics(&report);
        Ok(report)
    }

    async fn rollover_ticker(&self) -> AppResult<Ticker> {
        let exchange = self.deps.exchange.as_ref();
        let instrument = &self.instrument;
        retry_async(
            self.config.retry.rollover_policy(),
            "rollover_ticker",
            &self.deps.latch,
            move || exchange.get_ticker(instrument),
        )
        .await
        .map_err(rollover_error)
    }

    /// Archive the closed day and reset state if the day actually changed.
    async fn roll_over(&mut self, today: NaiveDate, ticker: &Ticker) -> AppResult<()> {
        match today.pred_opt() {
            Some(closed_day) if ticker.reference_close.is_positive() => {
                let record = DailyCloseRecord {
                    day: closed_day,
                    instrument: self.instrument.clone(),
                    reference_close: ticker.reference_close,
                    archived_at: Utc::now(),
                };
                let archive = &self.archive;
                let record = &record;
                retry_async(
                    self.config.retry.rollover_policy(),
                    "archive_daily_close",
                    &self.deps.latch,
                    move || async move { archive.append(record) },
                )
                .await
                .map_err(rollover_error)?;
            }
            _ => warn!(%today, "No usable reference close, daily close not archived"),
        }

        if self.state.trading_day == Some(today) {
            info!(%today, "Same trading day, keeping adaptive state");
        } else {
            if self.state.trading_day.is_some() {
                self.stats.output_daily_summary();
            }
            info!(
                previous = ?self.state.trading_day,
                %today,
                reference_close = %ticker.reference_close,
                "New trading day, resetting adaptive state"
            );
            self.state.reset_for_new_day(
                today,
                &self.config.strategy.band,
                &self.config.risk,
                self.config.pacing.initial_window(),
            );
            self.emit(EventRecord::info(
                "New trading day",
                format!("{today} reference close {}", ticker.reference_close),
            ))
            .await;
        }

        self.rolled_over_on = Some(today);
        Ok(())
    }

    /// Read, decide and act. Commits the new state only on success.
    async fn act(&mut self, ticker: Ticker) -> AppResult<CycleReport> {
        let index = cross_asset_index(self.deps.market_data.as_ref(), &self.index_instruments).await?;
        let position = self.deps.exchange.position(&self.instrument).await?;
        let (snapshot, next_cycle) = self.cycle.advance(&ticker, index);

        let mut state = self.state.clone();
        let daily_pct = snapshot.daily_pct();
        let outcome = self
            .take_action(&mut state, &snapshot, position.as_ref())
            .await?;

        state.window = modulate(state.window, snapshot.price.previous, snapshot.price.current);
        let sleep_secs = rand::thread_rng().gen_range(state.window.start..=state.window.end);

        let record = CycleRecord {
            daily_pct,
            cycle_pct: snapshot.cycle_pct(),
            long_down: state.bands.long.down,
            long_up: state.bands.long.up,
            short_down: state.bands.short.down,
            short_up: state.bands.short.up,
            long_open_count: state.bands.long_open_count,
            short_open_count: state.bands.short_open_count,
            up_counters: state.counters.up,
            down_counters: state.counters.down,
            position_notional: position
                .as_ref()
                .map_or(Decimal::ZERO, PositionInfo::signed_notional),
            order_size_units: state.risk.order_size_units,
            sleep_secs,
            trade_type: outcome.trade_type,
            snapshot,
        };

        self.state = state;
        self.cycle = next_cycle;
        for event in outcome.events {
            self.emit(event).await;
        }

        info!(
            price = %record.snapshot.price.current,
            daily_pct = ?record.daily_pct,
            trade_type = %outcome.trade_type.as_str(),
            sleep_secs,
            "Cycle complete"
        );

        Ok(CycleReport {
            trade_type: outcome.trade_type,
            record,
            sleep: Duration::from_secs(sleep_secs),
        })
    }

    /// Counters, then at most one order action.
    async fn take_action(
        &self,
        state: &mut EngineState,
        snapshot: &MarketSnapshot,
        position: Option<&PositionInfo>,
    ) -> AppResult<ActionOutcome> {
        let strategy = &self.config.strategy;

        let Some(daily_pct) = snapshot.daily_pct() else {
            warn!(
                reference_close = %snapshot.reference_close,
                "Degenerate reference close, skipping counters and signals"
            );
            return self.stop_loss(state, position).await;
        };

        state.counters = state
            .counters
            .update(daily_pct, &strategy.long_bins, &strategy.short_bins);

        if let Some(inputs) = SignalInputs::from_snapshot(snapshot) {
            let features = FeatureVector::from_snapshot(snapshot);
            let entry = evaluate_entry(
                &state.bands,
                &inputs,
                strategy.long_open_limit,
                strategy.short_open_limit,
                self.deps.gate.as_ref(),
                &features,
            );

            match entry {
                Some(side) => match state.risk.check_open(side, position, &self.config.risk) {
                    OpenDecision::Allowed => {
                        return self.open(state, snapshot, side, position).await
                    }
                    OpenDecision::CapReached { notional, limit } => {
                        info!(%side, %notional, %limit, "Position cap reached, entry skipped");
                        Metrics::cap_blocked(self.instrument.as_str(), side);
                    }
                },
                None => {
                    if long_signal(&state.bands, &inputs, strategy.long_open_limit) {
                        Metrics::gate_veto(self.instrument.as_str(), Side::Long);
                    } else if short_signal(&state.bands, &inputs, strategy.short_open_limit) {
                        Metrics::gate_veto(self.instrument.as_str(), Side::Short);
                    }
                }
            }
        }

        if let Some(tp) = evaluate_take_profit(daily_pct, position, &state.counters, &self.config.exit)
        {
            return self.take_profit(state, tp).await;
        }

        self.stop_loss(state, position).await
    }

    async fn open(
        &self,
        state: &mut EngineState,
        snapshot: &MarketSnapshot,
        side: Side,
        position: Option<&PositionInfo>,
    ) -> AppResult<ActionOutcome> {
        let units = state.risk.order_size_units;
        // An opposite-direction fill reduces or flips the held position and realizes pnl.
        let reducing = position
            .and_then(PositionInfo::side)
            .is_some_and(|held| held != side);
        let settled_before = if reducing {
            Some(self.last_settled_pnl().await)
        } else {
            None
        };
        let ack = self
            .deps
            .exchange
            .open_order(&self.instrument, side, units, self.config.leverage)
            .await?;

        let mut outcome = ActionOutcome::none();
        if !ack.accepted {
            if self.config.is_observation_mode() {
                info!(%side, units, "Observation mode, entry not sent");
            } else {
                warn!(%side, units, "Open order rejected");
                Metrics::order_failed(self.instrument.as_str(), TradeType::open(side).as_str());
                outcome.events.push(EventRecord::error(
                    format!("Open {side} failed"),
                    format!("{units} units at {} rejected", snapshot.price.current),
                ));
            }
            return Ok(outcome);
        }

        let realized = match settled_before {
            Some(before) => self.settle_realized_pnl(before).await,
            None => None,
        };
        if let Some(pnl) = realized {
            state.risk.record_realized(pnl);
        }

        let limits = &self.config.strategy.band;
        let (last, current) = (snapshot.price.previous, snapshot.price.current);
        state.bands.record_open(side);
        state.bands = adjust_for_frequency(&state.bands, side, limits);
        state.bands = match side {
            Side::Long => adjust_after_long_open(&state.bands, last, current, limits),
            Side::Short => adjust_after_short_open(&state.bands, last, current, limits),
        };

        info!(
            %side,
            units,
            price = %current,
            order_id = ?ack.order_id,
            open_count = state.bands.open_count(side),
            realized = ?realized,
            "Opened position"
        );
        let detail = match realized {
            Some(pnl) => format!("{units} units at {current}, realized {pnl}"),
            None => format!("{units} units at {current}"),
        };
        outcome.trade_type = TradeType::open(side);
        outcome
            .events
            .push(EventRecord::success(format!("Opened {side}"), detail));
        Ok(outcome)
    }

    async fn take_profit(&self, state: &mut EngineState, tp: TakeProfit) -> AppResult<ActionOutcome> {
        let before = self.last_settled_pnl().await;
        let closed = self
            .deps
            .exchange
            .close_all(&self.instrument, self.config.leverage, CloseMode::TakeProfit)
            .await?;

        let mut outcome = ActionOutcome::none();
        match closed {
            Some(CloseOutcome::Closed) => {
                info!(side = %tp.side, reason = ?tp.reason, "Take-profit closed position");
                state.reset_after_take_profit(
                    &self.config.strategy.band,
                    &self.config.risk,
                    self.config.pacing.initial_window(),
                );
                let pnl = self.settle_realized_pnl(before).await;
                if let Some(pnl) = pnl {
                    state.risk.record_realized(pnl);
                }
                outcome.trade_type = TradeType::take_profit(tp.side);
                outcome.events.push(EventRecord::success(
                    format!("Take-profit {}", tp.side),
                    format!("{:?}, realized {}", tp.reason, display_pnl(pnl)),
                ));
            }
            Some(CloseOutcome::Failed) => {
                warn!(side = %tp.side, "Take-profit close failed");
                Metrics::order_failed(self.instrument.as_str(), "take_profit");
                outcome.events.push(EventRecord::error(
                    format!("Take-profit {} failed", tp.side),
                    format!("{:?}", tp.reason),
                ));
            }
            None => debug!("Take-profit found nothing to close"),
        }
        Ok(outcome)
    }

    async fn stop_loss(
        &self,
        state: &mut EngineState,
        position: Option<&PositionInfo>,
    ) -> AppResult<ActionOutcome> {
        let mut outcome = ActionOutcome::none();
        if position.and_then(PositionInfo::side).is_none() {
            return Ok(outcome);
        }

        let mode = CloseMode::StopLoss {
            ratio_threshold: self.config.risk.stop_loss_ratio,
        };
        let before = self.last_settled_pnl().await;
        let closed = self
            .deps
            .exchange
            .close_all(&self.instrument, self.config.leverage, mode)
            .await?;

        match closed {
            Some(CloseOutcome::Closed) => {
                state.risk.escalate(&self.config.risk);
                let pnl = self.settle_realized_pnl(before).await;
                if let Some(pnl) = pnl {
                    state.risk.record_realized(pnl);
                }
                warn!(realized = %display_pnl(pnl), "Stop-loss closed position");
                outcome.trade_type = TradeType::StopLoss;
                outcome.events.push(EventRecord::success(
                    "Stop-loss",
                    format!(
                        "realized {}, order size now {} units",
                        display_pnl(pnl),
                        state.risk.order_size_units
                    ),
                ));
            }
            Some(CloseOutcome::Failed) => {
                error!("Stop-loss close failed");
                Metrics::order_failed(self.instrument.as_str(), "stop_loss");
                outcome
                    .events
                    .push(EventRecord::error("Stop-loss failed", "close order rejected"));
            }
            None => {}
        }
        Ok(outcome)
    }

    /// Realized pnl currently reported for the instrument, read before a fill.
    async fn last_settled_pnl(&self) -> Option<Decimal> {
        match self.deps.exchange.last_closed_pnl(&self.instrument).await {
            Ok(pnl) => pnl,
            Err(e) => {
                warn!(error = %e, "Realized pnl lookup before fill failed");
                None
            }
        }
    }

    /// Poll until the reported realized pnl moves off `before`. Either sign is booked.
    async fn settle_realized_pnl(&self, before: Option<Decimal>) -> Option<Decimal> {
        let polls = self.config.retry.pnl_settle_polls;
        for poll in 0..polls {
            if poll > 0 && !self.deps.latch.sleep(self.config.retry.pnl_settle_delay()).await {
                return None;
            }
            match self.deps.exchange.last_closed_pnl(&self.instrument).await {
                Ok(Some(pnl)) if Some(pnl) != before => {
                    debug!(%pnl, poll, "Realized pnl settled");
                    return Some(pnl);
                }
                Ok(other) => debug!(pnl = ?other, poll, "Realized pnl not settled yet"),
                Err(e) => warn!(error = %e, poll, "Realized pnl lookup failed"),
            }
        }
        warn!(polls, "Realized pnl did not settle, skipping accounting");
        None
    }

    fn publish_metrics(&self, report: &CycleReport) {
        let instrument = self.instrument.as_str();
        let state = &self.state;

        Metrics::cycle_completed(instrument);
        if let Some(pct) = report.record.daily_pct {
            Metrics::daily_pct(instrument, pct);
        }
        Metrics::action(instrument, report.trade_type);
        Metrics::band(instrument, Side::Long, state.bands.long.down, state.bands.long.up);
        Metrics::band(instrument, Side::Short, state.bands.short.down, state.bands.short.up);
        Metrics::open_count(instrument, Side::Long, state.bands.long_open_count);
        Metrics::open_count(instrument, Side::Short, state.bands.short_open_count);
        Metrics::interval_counters(instrument, &state.counters.up, &state.counters.down);
        Metrics::order_size(instrument, state.risk.order_size_units);
        Metrics::realized_pnl(
            instrument,
            state.risk.cumulative_profit.to_f64().unwrap_or(0.0),
            state.risk.cumulative_loss.to_f64().unwrap_or(0.0),
        );
        Metrics::sleep(instrument, report.sleep.as_secs_f64());
    }
}

fn display_pnl(pnl: Option<Decimal>) -> String {
    pnl.map_or_else(|| "unsettled".to_string(), |p| p.to_string())
}

fn bootstrap_error<E: fmt::Display>(err: RetryError<E>) -> AppError {
    match err {
        RetryError::Cancelled { .. } => AppError::Shutdown,
        RetryError::Exhausted { operation, last, .. } => {
            AppError::Config(format!("{operation}: {last}"))
        }
    }
}

fn rollover_error<E: fmt::Display>(err: RetryError<E>) -> AppError {
    match err {
        RetryError::Cancelled { .. } => AppError::Shutdown,
        exhausted => AppError::Rollover(exhausted.to_string()),
    }
}

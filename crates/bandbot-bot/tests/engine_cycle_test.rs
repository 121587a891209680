//! Orchestration loop integration tests.
//!
//! Drives single cycles against the paper exchange:
//! - entries, take-profit and stop-loss with their state updates
//! - at most one order action per cycle
//! - persistence every cycle, day rollover and same-day restart
//! - failure handling of the cycle and of the whole loop

mod integration;
use integration::common::harness::{day, index, traded, Harness};

use std::time::Duration;

use bandbot::{EnginePhase, OperatingMode};
use bandbot_core::{Side, TradeType};
use bandbot_gateway::ExchangeGateway;
use bandbot_persistence::{DailyCloseArchive, EventStatus, LoadOutcome, SnapshotStore};
use bandbot_risk::ShutdownReason;
use bandbot_strategy::{BandLimits, BandState};
use rust_decimal_macros::dec;

const EPS: f64 = 1e-9;

/// Open one paper contract on `side` at the current mark.
async fn hold(h: &Harness, side: Side) {
    let ack = h.paper.open_order(&traded(), side, 1, 10).await.unwrap();
    assert!(ack.accepted);
}

// ============================================================================
// Entries
// ============================================================================

#[tokio::test]
async fn test_long_entry_retunes_opposite_band() {
    let mut h = Harness::new();
    h.push_price(dec!(2004), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    let mut engine = h.started_engine().await;

    // First cycle has no previous price, so no cycle move.
    let first = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(first.trade_type, TradeType::None);

    let second = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(second.trade_type, TradeType::OpenLong);

    let state = engine.state();
    let limits = BandLimits::default();
    assert_eq!(state.bands.long_open_count, 1);
    assert_eq!(state.bands.short_open_count, 0);
    // Move of ~0.001 in the long direction widens the short band by the fine step.
    assert!((state.bands.short.up - 0.0057).abs() < EPS);
    assert!((state.bands.short.down - limits.floor()).abs() < EPS);
    assert_eq!(state.bands.long, BandState::new(&limits).long);

    let position = h.paper.position(&traded()).await.unwrap().unwrap();
    assert_eq!(position.side(), Some(Side::Long));

    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| e.status == EventStatus::Success && e.subject.contains("Opened")));
}

#[tokio::test]
async fn test_cap_blocked_entry_leaves_the_slot_free() {
    let h = Harness::new();
    h.push_price(dec!(2004), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    h.push_price(dec!(2008), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    let opened = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(opened.trade_type, TradeType::OpenLong);

    // Still a long signal, but 0.1 ETH at ~2008 is over the 150 - 10 cap.
    let blocked = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(blocked.trade_type, TradeType::None);
    assert_eq!(engine.state().bands.long_open_count, 1);

    let position = h.paper.position(&traded()).await.unwrap().unwrap();
    assert_eq!(position.size.inner(), dec!(1));
}

#[tokio::test]
async fn test_observation_mode_never_opens() {
    let mut h = Harness::with_mode(OperatingMode::Observation);
    h.push_price(dec!(2004), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    let report = engine.run_cycle_on(day(1)).await.unwrap();

    assert_eq!(report.trade_type, TradeType::None);
    assert_eq!(engine.state().bands.long_open_count, 0);
    assert!(h.paper.position(&traded()).await.unwrap().is_none());
    assert!(h
        .drain_events()
        .iter()
        .all(|e| e.status != EventStatus::Error));
}

// ============================================================================
// Exits
// ============================================================================

#[tokio::test]
async fn test_extreme_move_takes_profit_and_resets() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(2600), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;

    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::TakeProfitLong);
    assert_eq!(report.record.trade_type.code(), 2);

    let state = engine.state();
    assert_eq!(state.bands, BandState::new(&BandLimits::default()));
    assert_eq!(state.counters.up, [0; 4]);
    assert_eq!(state.risk.order_size_units, 1);
    // 0.1 ETH x (2600 - 2000)
    assert_eq!(state.risk.cumulative_profit, dec!(60));
    assert!(h.paper.position(&traded()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_take_profit_at_a_loss_books_the_loss() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(1400), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;

    // -30% is an extreme move: the long is closed under water.
    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::TakeProfitLong);

    let risk = &engine.state().risk;
    // 0.1 ETH x (1400 - 2000)
    assert_eq!(risk.cumulative_loss, dec!(-60));
    assert_eq!(risk.cumulative_profit, dec!(0));
    assert_eq!(h.paper.last_closed_pnl(&traded()).await.unwrap(), Some(dec!(-60)));
}

#[tokio::test]
async fn test_stop_loss_escalates_sizing() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(1880), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;

    // -6% at 10x leverage is a -0.6 unrealized ratio.
    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::StopLoss);

    let risk = &engine.state().risk;
    assert_eq!(risk.order_size_units, 2);
    assert_eq!(risk.position_value_cap, dec!(175));
    assert_eq!(risk.cumulative_loss, dec!(-12));
    assert!(h.paper.position(&traded()).await.unwrap().is_none());

    // The -6% daily move landed in the third down bin.
    assert_eq!(engine.state().counters.down, [0, 0, 1, 0]);
}

#[tokio::test]
async fn test_small_loss_is_held() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(1980), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;

    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::None);
    assert_eq!(engine.state().risk.order_size_units, 1);
    assert!(h.paper.position(&traded()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rejected_close_is_recorded_as_error() {
    let mut h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(1880), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;
    h.paper.set_reject_orders(true);

    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::None);
    assert_eq!(engine.state().risk.order_size_units, 1);
    assert!(h
        .drain_events()
        .iter()
        .any(|e| e.status == EventStatus::Error && e.subject.contains("Stop-loss")));
}

// ============================================================================
// One action per cycle
// ============================================================================

#[tokio::test]
async fn test_entry_wins_over_stop_loss_and_books_the_flattened_short() {
    let h = Harness::new();
    h.push_price(dec!(1900), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Short).await;

    // The short sits at a -0.558 ratio, past the stop-loss threshold, while
    // a long signal fires. Only the entry runs.
    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::OpenLong);
    assert_eq!(report.record.trade_type, TradeType::OpenLong);

    let state = engine.state();
    assert_eq!(state.bands.long_open_count, 1);
    assert_eq!(state.risk.order_size_units, 1);
    // The long fill flattened the short: 0.1 ETH x (1900 - 2006)
    assert_eq!(state.risk.cumulative_loss, dec!(-10.6));
    assert_eq!(state.risk.cumulative_profit, dec!(0));
    assert!(h.paper.position(&traded()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_take_profit_wins_over_stop_loss() {
    let mut h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(1400), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;
    h.drain_events();

    // -3.0 unrealized ratio is far past the stop-loss threshold too.
    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::TakeProfitLong);
    assert_eq!(engine.state().risk.order_size_units, 1);
    assert_eq!(engine.state().risk.position_value_cap, dec!(150));
    assert!(h.paper.position(&traded()).await.unwrap().is_none());

    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].subject.contains("Take-profit"));
    assert!(events.iter().all(|e| !e.subject.contains("Stop-loss")));
}

#[tokio::test]
async fn test_degenerate_reference_close_still_checks_stop_loss() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.push_price(dec!(1880), dec!(0));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    hold(&h, Side::Long).await;

    let report = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(report.trade_type, TradeType::StopLoss);
    assert!(report.record.daily_pct.is_none());
    assert_eq!(engine.state().counters.down, [0; 4]);
}

// ============================================================================
// Persistence and rollover
// ============================================================================

#[tokio::test]
async fn test_every_cycle_persists_and_queues_a_record() {
    let mut h = Harness::new();
    h.push_price(dec!(2004), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(engine.phase(), EnginePhase::Persisting);

    let store = SnapshotStore::new(h.config.persistence.snapshot_path.clone());
    let LoadOutcome::Loaded(snapshot) = store.load().unwrap() else {
        panic!("snapshot missing");
    };
    assert_eq!(snapshot.trading_day, Some(day(1)));
    assert_eq!(snapshot.long_open_count, 1);

    let records = h.drain_records();
    let kinds: Vec<TradeType> = records.iter().map(|r| r.trade_type).collect();
    assert_eq!(kinds, vec![TradeType::None, TradeType::OpenLong]);
    assert!(records.iter().all(|r| r.sleep_secs >= 1));
}

#[tokio::test]
async fn test_same_day_restart_keeps_state_and_new_day_resets() {
    let h = Harness::new();
    h.push_price(dec!(2004), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    {
        let mut engine = h.started_engine().await;
        engine.run_cycle_on(day(1)).await.unwrap();
        engine.run_cycle_on(day(1)).await.unwrap();
        assert_eq!(engine.state().bands.long_open_count, 1);
    }

    let mut restarted = h.started_engine().await;
    assert_eq!(restarted.state().bands.long_open_count, 1);

    restarted.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(restarted.state().bands.long_open_count, 1);
    assert_eq!(restarted.state().trading_day, Some(day(1)));

    restarted.run_cycle_on(day(2)).await.unwrap();
    let state = restarted.state();
    assert_eq!(state.trading_day, Some(day(2)));
    assert_eq!(state.bands, BandState::new(&BandLimits::default()));

    let archive = DailyCloseArchive::new(h.config.persistence.archive_path.clone());
    let last = archive.last().unwrap().unwrap();
    assert_eq!(last.day, day(1));
    assert_eq!(last.reference_close.inner(), dec!(2000));
    let lines = std::fs::read_to_string(archive.path()).unwrap();
    assert_eq!(lines.lines().count(), 2);
}

#[tokio::test]
async fn test_malformed_snapshot_starts_from_defaults() {
    let mut h = Harness::new();
    std::fs::write(&h.config.persistence.snapshot_path, "{ not json").unwrap();

    let engine = h.started_engine().await;
    assert_eq!(engine.state().bands, BandState::new(&BandLimits::default()));
    assert!(h
        .drain_events()
        .iter()
        .any(|e| e.status == EventStatus::Error));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_cycle_is_retried_against_the_same_baseline() {
    let h = Harness::new();
    h.push_price(dec!(2004), dec!(2000));
    h.push_price(dec!(2006), dec!(2000));
    let mut engine = h.started_engine().await;

    engine.run_cycle_on(day(1)).await.unwrap();
    let before = engine.state().clone();

    h.market.fail_next(&index(), 1);
    let err = engine.run_cycle_on(day(1)).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(engine.state(), &before);

    // The last scripted price repeats; the move against 2004 is still seen.
    let retried = engine.run_cycle_on(day(1)).await.unwrap();
    assert_eq!(retried.trade_type, TradeType::OpenLong);
}

#[tokio::test]
async fn test_loop_stops_after_failure_budget() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.market.fail_next(&index(), u32::MAX);
    let latch = h.latch();
    let mut engine = h.engine();

    tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .unwrap()
        .unwrap();

    match latch.reason() {
        Some(ShutdownReason::CycleFailures { count, .. }) => assert_eq!(count, 4),
        other => panic!("unexpected shutdown reason: {other:?}"),
    }
    assert_eq!(engine.phase(), EnginePhase::ShuttingDown);
    assert!(h.config.persistence.snapshot_path.exists());
}

#[tokio::test]
async fn test_rollover_failure_is_fatal() {
    let h = Harness::new();
    h.push_price(dec!(2000), dec!(2000));
    h.market.fail_next(&traded(), u32::MAX);
    let latch = h.latch();
    let mut engine = h.engine();

    tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        latch.reason(),
        Some(ShutdownReason::RolloverFailed { .. })
    ));
}

//! Per-cycle market observations.
//!
//! `CycleState` is the only thing carried from one cycle to the next. Each
//! cycle hands it the fresh ticker and gets back an immutable
//! `MarketSnapshot` plus the state for the following cycle.

use crate::decimal::{pct_change, Price, Size};
use crate::market::{InstrumentId, Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of prices in the trailing average.
pub const TRAILING_WINDOW: usize = 5;

/// A value paired with its previous-cycle counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend<T> {
    pub previous: T,
    pub current: T,
}

impl<T: PartialOrd + Copy> Trend<T> {
    pub fn new(previous: T, current: T) -> Self {
        Self { previous, current }
    }

    #[must_use]
    pub fn non_decreasing(&self) -> bool {
        self.current >= self.previous
    }

    #[must_use]
    pub fn non_increasing(&self) -> bool {
        self.current <= self.previous
    }
}

/// Everything the strategy reads in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub observed_at: DateTime<Utc>,
    pub instrument: InstrumentId,
    pub price: Trend<Price>,
    pub bid_size: Trend<Size>,
    pub ask_size: Trend<Size>,
    pub volume_24h: Trend<Size>,
    /// Trailing average over the last [`TRAILING_WINDOW`] prices, 0 until filled.
    pub average: Trend<f64>,
    /// Cross-asset normalized index.
    pub index: Trend<f64>,
    pub reference_close: Price,
}

impl MarketSnapshot {
    /// Change against the previous day's close. `None` if the reference is zero.
    pub fn daily_pct(&self) -> Option<f64> {
        pct_change(self.reference_close, self.price.current)
    }

    /// Change against the previous cycle. `None` on the first cycle.
    pub fn cycle_pct(&self) -> Option<f64> {
        pct_change(self.price.previous, self.price.current)
    }
}

/// Values carried forward from the previous cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleState {
    last_price: Price,
    bid_size: Size,
    ask_size: Size,
    volume_24h: Size,
    average: f64,
    index: f64,
    recent: VecDeque<Price>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Price seen in the previous cycle, zero before the first one.
    pub fn last_price(&self) -> Price {
        self.last_price
    }

    /// Number of prices currently in the trailing window.
    pub fn samples(&self) -> usize {
        self.recent.len()
    }

    /// Combine the carried state with this cycle's observation.
    ///
    /// Returns the snapshot for this cycle and the state to carry into the
    /// next one. `self` is left untouched so a failed cycle can be retried
    /// against the same baseline.
    pub fn advance(&self, ticker: &Ticker, index: f64) -> (MarketSnapshot, CycleState) {
        let mut recent = self.recent.clone();
        recent.push_back(ticker.last);
        while recent.len() > TRAILING_WINDOW {
            recent.pop_front();
        }
        let average = if recent.len() == TRAILING_WINDOW {
            recent.iter().map(Price::to_f64).sum::<f64>() / TRAILING_WINDOW as f64
        } else {
            0.0
        };

        let snapshot = MarketSnapshot {
            observed_at: ticker.observed_at,
            instrument: ticker.instrument.clone(),
            price: Trend::new(self.last_price, ticker.last),
            bid_size: Trend::new(self.bid_size, ticker.bid_size),
            ask_size: Trend::new(self.ask_size, ticker.ask_size),
            volume_24h: Trend::new(self.volume_24h, ticker.volume_24h),
            average: Trend::new(self.average, average),
            index: Trend::new(self.index, index),
            reference_close: ticker.reference_close,
        };

        let next = CycleState {
            last_price: ticker.last,
            bid_size: ticker.bid_size,
            ask_size: ticker.ask_size,
            volume_24h: ticker.volume_24h,
            average,
            index,
            recent,
        };

        (snapshot, next)
    }
}

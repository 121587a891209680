//! Read-only market data.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use bandbot_core::{InstrumentId, Ticker};

use crate::error::{GatewayError, GatewayResult};

/// Source of tickers for any instrument.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker>;
}

/// Mean of `last / reference_close` across `tickers`.
///
/// Tickers with a non-positive reference close are skipped; with nothing
/// usable the index is 0.0.
pub fn normalized_index(tickers: &[Ticker]) -> f64 {
    let ratios: Vec<f64> = tickers
        .iter()
        .filter(|t| t.reference_close.is_positive())
        .map(|t| t.last.to_f64() / t.reference_close.to_f64())
        .collect();
    if ratios.is_empty() {
        return 0.0;
    }
    ratios.iter().sum::<f64>() / ratios.len() as f64
}

/// Fetch every index instrument and fold them into [`normalized_index`].
pub async fn cross_asset_index(
    source: &dyn MarketDataSource,
    instruments: &[InstrumentId],
) -> GatewayResult<f64> {
    let mut tickers = Vec::with_capacity(instruments.len());
    for instrument in instruments {
        tickers.push(source.ticker(instrument).await?);
    }
    let index = normalized_index(&tickers);
    debug!(instruments = instruments.len(), index, "Cross-asset index");
    Ok(index)
}

/// Replays queued tickers per instrument; the last one repeats once the
/// queue is drained.
#[derive(Debug, Default)]
pub struct ScriptedMarketData {
    inner: Mutex<HashMap<InstrumentId, (VecDeque<Ticker>, Option<Ticker>)>>,
}

impl ScriptedMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a ticker for its instrument.
    pub fn push(&self, ticker: Ticker) {
        self.inner
            .lock()
            .entry(ticker.instrument.clone())
            .or_default()
            .0
            .push_back(ticker);
    }

    /// Queued tickers not yet served for `instrument`.
    pub fn remaining(&self, instrument: &InstrumentId) -> usize {
        self.inner
            .lock()
            .get(instrument)
            .map_or(0, |(queue, _)| queue.len())
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarketData {
    async fn ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker> {
        let mut inner = self.inner.lock();
        let (queue, last) = inner
            .get_mut(instrument)
            .ok_or_else(|| GatewayError::Parse(format!("no ticker scripted for {instrument}")))?;
        if let Some(next) = queue.pop_front() {
            *last = Some(next);
        }
        last.clone()
            .ok_or_else(|| GatewayError::Parse(format!("no ticker scripted for {instrument}")))
    }
}

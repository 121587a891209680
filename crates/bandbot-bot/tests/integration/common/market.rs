//! Market data doubles.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bandbot_core::{InstrumentId, Price, Size, Ticker};
use bandbot_gateway::{GatewayError, GatewayResult, MarketDataSource, ScriptedMarketData};

/// Ticker with fixed book depth and volume.
pub fn ticker(instrument: &InstrumentId, last: Decimal, reference_close: Decimal) -> Ticker {
    Ticker {
        instrument: instrument.clone(),
        last: Price::new(last),
        bid_size: Size::new(dec!(10)),
        ask_size: Size::new(dec!(10)),
        volume_24h: Size::new(dec!(1000)),
        reference_close: Price::new(reference_close),
        observed_at: Utc::now(),
    }
}

/// Scripted tickers with injectable per-instrument failures.
#[derive(Debug, Default)]
pub struct FlakyMarketData {
    inner: ScriptedMarketData,
    failures: Mutex<HashMap<InstrumentId, u32>>,
}

impl FlakyMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, ticker: Ticker) {
        self.inner.push(ticker);
    }

    /// Fail the next `count` requests for `instrument`.
    pub fn fail_next(&self, instrument: &InstrumentId, count: u32) {
        self.failures.lock().insert(instrument.clone(), count);
    }
}

#[async_trait]
impl MarketDataSource for FlakyMarketData {
    async fn ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker> {
        {
            let mut failures = self.failures.lock();
            if let Some(left) = failures.get_mut(instrument) {
                if *left > 0 {
                    *left -= 1;
                    return Err(GatewayError::HttpClient(format!(
                        "injected failure for {instrument}"
                    )));
                }
            }
        }
        self.inner.ticker(instrument).await
    }
}

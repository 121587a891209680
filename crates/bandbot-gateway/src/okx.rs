//! OKX public market data over REST.
//!
//! Only the unauthenticated ticker endpoint is used. The previous day's
//! close is OKX's `sodUtc8` (start-of-day price, UTC+8).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use bandbot_core::{InstrumentId, Price, Size, Ticker};

use crate::error::{GatewayError, GatewayResult};
use crate::market_data::MarketDataSource;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production REST base URL.
pub const OKX_BASE_URL: &str = "https://www.okx.com";

#[derive(Debug, Deserialize)]
struct OkxEnvelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    inst_id: String,
    last: String,
    bid_sz: String,
    ask_sz: String,
    vol_24h: String,
    sod_utc8: String,
    ts: String,
}

/// Parse a `/api/v5/market/ticker` response body.
pub fn parse_ticker(body: &str) -> GatewayResult<Ticker> {
    let envelope: OkxEnvelope<RawTicker> = serde_json::from_str(body)?;
    if envelope.code != "0" {
        return Err(GatewayError::Api {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    let raw = envelope
        .data
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Parse("empty ticker data".to_string()))?;

    fn field<T: std::str::FromStr>(name: &str, value: &str) -> GatewayResult<T> {
        value
            .parse()
            .map_err(|_| GatewayError::Parse(format!("{name}: {value:?}")))
    }

    let ts_ms: i64 = field("ts", &raw.ts)?;
    let observed_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(ts_ms)
        .single()
        .ok_or_else(|| GatewayError::Parse(format!("ts out of range: {ts_ms}")))?;

    Ok(Ticker {
        instrument: InstrumentId::new(raw.inst_id),
        last: field::<Price>("last", &raw.last)?,
        bid_size: field::<Size>("bidSz", &raw.bid_sz)?,
        ask_size: field::<Size>("askSz", &raw.ask_sz)?,
        volume_24h: field::<Size>("vol24h", &raw.vol_24h)?,
        reference_close: field::<Price>("sodUtc8", &raw.sod_utc8)?,
        observed_at,
    })
}

/// OKX public ticker client.
pub struct OkxMarketData {
    client: Client,
    base_url: String,
}

impl OkxMarketData {
    /// Create a new client against `base_url` (e.g. [`OKX_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for OkxMarketData {
    async fn ticker(&self, instrument: &InstrumentId) -> GatewayResult<Ticker> {
        let url = format!("{}/api/v5/market/ticker", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("instId", instrument.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("Failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ticker = parse_ticker(&body)?;
        debug!(
            instrument = %ticker.instrument,
            last = %ticker.last,
            reference_close = %ticker.reference_close,
            "Ticker fetched"
        );
        Ok(ticker)
    }
}

//! External collaborators of the band trader.
//!
//! Everything the orchestration loop talks to outside the process sits behind
//! a trait here:
//! - `ExchangeGateway`: tickers, positions, orders, realized pnl
//! - `MarketDataSource`: read-only tickers (also feeds the cross-asset index)
//! - `AlertSink`: fire-and-forget operator notifications
//! - `ShutdownSwitch`: externally mutable run/stop flag
//!
//! Shipped implementations: OKX public market data over REST, a paper
//! exchange, an observation wrapper that never sends orders, log and webhook
//! alert sinks, and a file-backed switch.

pub mod alert;
pub mod error;
pub mod exchange;
pub mod market_data;
pub mod observe;
pub mod okx;
pub mod paper;
pub mod switch;

pub use alert::{notify, AlertSink, LogAlertSink, WebhookAlertSink};
pub use error::{GatewayError, GatewayResult};
pub use exchange::{CloseMode, CloseOutcome, ExchangeGateway, OrderAck};
pub use market_data::{cross_asset_index, normalized_index, MarketDataSource, ScriptedMarketData};
pub use observe::ObservationExchange;
pub use okx::{parse_ticker, OkxMarketData, OKX_BASE_URL};
pub use paper::{PaperConfig, PaperExchange};
pub use switch::{FileSwitch, ShutdownSwitch};

//! Market snapshot provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over exchanges so the scheduler can be
//! driven by Bybit in production and by an in-memory provider in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CandleError, CandleSeries, FundingAndOI, OrderBookAggregate, Timeframe};

/// Default number of book levels summed on each side.
pub const DEFAULT_BOOK_DEPTH: usize = 10;

/// Structured error types for snapshot fetches.
///
/// Every variant means "no data for this pair this cycle"; the variants only
/// differ for diagnostics.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (HTTP 429) for {url}")]
    RateLimited { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("exchange error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error(transparent)]
    Series(#[from] CandleError),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Trait for market snapshot providers.
///
/// Candle series are returned ascending by timestamp regardless of the order
/// the exchange sends them in.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Most recent `limit` candles.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, DataError>;

    /// Every candle with an open time at or after `since_ms`, paging as needed.
    async fn get_candles_since(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
    ) -> Result<CandleSeries, DataError>;

    /// Summed top-`depth` liquidity on each side of the book.
    async fn get_orderbook_aggregate(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookAggregate, DataError>;

    /// Funding rate and open-interest change. Never fails: each field is
    /// independently absent when its source is unavailable.
    async fn get_funding_and_oi(&self, symbol: &str) -> FundingAndOI;

    /// USDT-quoted symbols whose 24h turnover is below `max_turnover`.
    async fn list_symbols_below_turnover(&self, max_turnover: f64)
        -> Result<Vec<String>, DataError>;
}

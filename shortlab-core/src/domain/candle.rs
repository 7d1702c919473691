//! Candle, the fundamental market data unit, and the ascending series built from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bar interval in whole minutes.
///
/// Rendered as the exchange interval string (`"5"`) via [`Timeframe::interval`]
/// and as `5m` for humans via `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeframe(u32);

impl Timeframe {
    pub const ONE_MINUTE: Timeframe = Timeframe(1);
    pub const THREE_MINUTES: Timeframe = Timeframe(3);
    pub const FIVE_MINUTES: Timeframe = Timeframe(5);
    pub const FIFTEEN_MINUTES: Timeframe = Timeframe(15);

    pub fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn as_minutes(&self) -> u32 {
        self.0
    }

    /// Exchange interval parameter (`"1"`, `"5"`, `"15"`).
    pub fn interval(&self) -> String {
        self.0.to_string()
    }

    pub fn duration_ms(&self) -> i64 {
        i64::from(self.0) * 60_000
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// OHLCV candle. `timestamp` is the candle open time in Unix milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Typical price (high + low + close) / 3, the MFI input.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandleError {
    #[error("empty candle series for {symbol} ({timeframe})")]
    Empty { symbol: String, timeframe: Timeframe },
}

/// Non-empty candle series for one symbol and timeframe, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series from candles in any order.
    ///
    /// Sorts ascending and drops duplicate timestamps (first occurrence wins).
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        mut candles: Vec<Candle>,
    ) -> Result<Self, CandleError> {
        let symbol = symbol.into();
        if candles.is_empty() {
            return Err(CandleError::Empty { symbol, timeframe });
        }
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Ok(Self {
            symbol,
            timeframe,
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> &Candle {
        // non-empty by construction
        &self.candles[self.candles.len() - 1]
    }

    pub fn latest_close(&self) -> f64 {
        self.last().close
    }

    pub fn previous_close(&self) -> Option<f64> {
        let n = self.candles.len();
        (n >= 2).then(|| self.candles[n - 2].close)
    }
}

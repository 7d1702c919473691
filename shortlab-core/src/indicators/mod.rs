//! Indicator library.
//!
//! Indicators are pure functions: candle history in, numeric series out, same
//! length as the input. Warm-up positions hold `f64::NAN`; callers read NaN as
//! "indicator not ready", never as an error. Every ratio whose denominator can
//! be zero adds [`EPSILON`](crate::domain::EPSILON), so flat prices give finite
//! (if extreme) values.
//!
//! Single-series indicators implement [`Indicator`] and are held as configured
//! instances by the evaluator and the reversal scanner. MACD yields three
//! aligned series from one pass and is a plain function.

pub mod ema;
pub mod macd;
pub mod mfi;
pub mod rolling_low;
pub mod stoch_rsi;

pub use ema::{ema_of_series, Ema};
pub use macd::{macd, MacdSeries};
pub use mfi::{mfi, Mfi};
pub use rolling_low::{lowest_low, RollingLow};
pub use stoch_rsi::{rsi_of_series, stoch_rsi, StochRsi};

use crate::domain::Candle;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at index t may depend on candles after t. A truncated series and
/// the full series must agree on every overlapping index.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "stoch_rsi_14").
    fn name(&self) -> &str;

    /// Number of leading NaN values before the first defined output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Latest defined value of a series, if the last index is past warm-up.
pub fn latest(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| !v.is_nan())
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle), high = max(open,close) + 1,
/// low = min(open,close) - 1, volume = 1000, one minute apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: i as i64 * 60_000,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

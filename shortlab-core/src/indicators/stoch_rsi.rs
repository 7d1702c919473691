//! Stochastic RSI.
//!
//! RSI uses Wilder smoothing of average gains and losses, seeded with the
//! simple average of the first `period` changes:
//! RSI = 100 - 100 / (1 + avg_gain / (avg_loss + ε))
//!
//! The RSI is then rescaled into [0, 1] against its own rolling min/max over
//! `period` values: (rsi - min) / (max - min + ε).
//!
//! Lookback: period for RSI, 2 * period - 1 for StochRSI.
//! Flat prices: RSI = 0 and StochRSI = 0, both finite.

use super::Indicator;
use crate::domain::{Candle, EPSILON};

#[derive(Debug, Clone)]
pub struct StochRsi {
    period: usize,
    name: String,
}

impl StochRsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "StochRSI period must be >= 1");
        Self {
            period,
            name: format!("stoch_rsi_{period}"),
        }
    }
}

impl Indicator for StochRsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        stoch_rsi(&closes, self.period)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    100.0 - 100.0 / (1.0 + avg_gain / (avg_loss + EPSILON))
}

/// Wilder RSI over a raw close series. Defined from index `period`.
pub fn rsi_of_series(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    // Seed: average gain and average loss over the first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let ch = closes[i] - closes[i - 1];
        if ch.is_nan() {
            return result;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    let p = period as f64;
    for i in (period + 1)..n {
        let ch = closes[i] - closes[i - 1];
        if ch.is_nan() {
            return result;
        }
        let (gain, loss) = if ch > 0.0 { (ch, 0.0) } else { (0.0, -ch) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

/// StochRSI over a raw close series. Defined from index `2 * period - 1`.
pub fn stoch_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let rsi = rsi_of_series(closes, period);
    let n = rsi.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }

    for i in 0..n {
        if i + 1 < period {
            continue;
        }
        let window = &rsi[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        result[i] = (rsi[i] - lo) / (hi - lo + EPSILON);
    }

    result
}

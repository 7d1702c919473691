//! Rolling minimum of lows.
//!
//! low_min[t] = min(low[t-period+1..=t]), the current candle included.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct RollingLow {
    period: usize,
    name: String,
}

impl RollingLow {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rolling low period must be >= 1");
        Self {
            period,
            name: format!("lowest_low_{period}"),
        }
    }
}

impl Indicator for RollingLow {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        lowest_low(candles, self.period)
    }
}

pub fn lowest_low(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &candles[i + 1 - period..=i];
        if window.iter().any(|c| c.low.is_nan()) {
            continue;
        }
        result[i] = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    }

    result
}

//! Money Flow Index (MFI).
//!
//! typical = (high + low + close) / 3, flow = typical * volume.
//! A flow counts as positive when typical rises against the previous candle
//! and negative when it falls; unchanged flows count as neither.
//! MFI = 100 * pos / (pos + neg + ε) over the last `period` flows.
//! Lookback: period.

use super::Indicator;
use crate::domain::{Candle, EPSILON};

#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
    name: String,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self {
            period,
            name: format!("mfi_{period}"),
        }
    }
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        mfi(candles, self.period)
    }
}

pub fn mfi(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let mut positive = vec![0.0; n];
    let mut negative = vec![0.0; n];
    for i in 1..n {
        let tp = candles[i].typical_price();
        let prev = candles[i - 1].typical_price();
        let flow = tp * candles[i].volume;
        if tp > prev {
            positive[i] = flow;
        } else if tp < prev {
            negative[i] = flow;
        }
    }

    for i in period..n {
        let window = i + 1 - period..=i;
        let pos: f64 = positive[window.clone()].iter().sum();
        let neg: f64 = negative[window].iter().sum();
        result[i] = 100.0 * pos / (pos + neg + EPSILON);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles};

    #[test]
    fn rising_prices_near_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let m = mfi(&make_candles(&closes), 14);
        assert!(m[13].is_nan());
        assert!(m[14] > 99.99);
    }

    #[test]
    fn falling_prices_near_0() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let m = mfi(&make_candles(&closes), 14);
        assert_approx(m[19], 0.0, 1e-6);
    }

    #[test]
    fn flat_prices_are_zero_not_nan() {
        let m = Mfi::new(14).compute(&make_candles(&[50.0; 20]));
        assert_approx(m[19], 0.0, 1e-9);
    }

    #[test]
    fn volume_weights_the_flows() {
        // One up-move with heavy volume, one down-move with light volume.
        let mut candles = make_candles(&[10.0, 11.0, 9.0]);
        candles[1].volume = 9000.0;
        candles[2].volume = 1000.0;
        let m = mfi(&candles, 2);
        let up = candles[1].typical_price() * 9000.0;
        let down = candles[2].typical_price() * 1000.0;
        assert_approx(m[2], 100.0 * up / (up + down + EPSILON), 1e-9);
        assert!(m[2] > 80.0);
    }
}

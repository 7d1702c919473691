//! MACD (12, 26, 9).
//!
//! line = EMA12(close) - EMA26(close)
//! signal = EMA9(line), seeded on the first 9 defined line values
//! histogram = line - signal
//!
//! The three series come from one pass, so MACD is a free function rather
//! than an `Indicator`.
//! Lookback: 25 for the line, 33 for signal and histogram.

use super::ema::{ema_after_warmup, ema_of_series};

pub const FAST_PERIOD: usize = 12;
pub const SLOW_PERIOD: usize = 26;
pub const SIGNAL_PERIOD: usize = 9;

/// All three MACD series, aligned to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute MACD over close prices.
pub fn macd(closes: &[f64]) -> MacdSeries {
    let fast = ema_of_series(closes, FAST_PERIOD);
    let slow = ema_of_series(closes, SLOW_PERIOD);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_after_warmup(&line, SIGNAL_PERIOD);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    MacdSeries {
        line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn constant_price_gives_zero_macd() {
        let closes = vec![50.0; 60];
        let m = macd(&closes);
        assert!(m.line[24].is_nan());
        assert_approx(m.line[25], 0.0, DEFAULT_EPSILON);
        assert!(m.signal[32].is_nan());
        assert_approx(m.signal[33], 0.0, DEFAULT_EPSILON);
        assert_approx(m.histogram[59], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn series_are_aligned_to_input() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let m = macd(&closes);
        assert_eq!(m.line.len(), 40);
        assert_eq!(m.signal.len(), 40);
        assert_eq!(m.histogram.len(), 40);
    }

    #[test]
    fn rising_trend_has_positive_line() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let m = macd(&closes);
        assert!(m.line[59] > 0.0);
    }

    #[test]
    fn rollover_turns_histogram_negative() {
        let mut closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..10).map(|i| 148.0 - i as f64 * 6.0));
        let m = macd(&closes);
        let last = closes.len() - 1;
        assert!(m.line[last] < m.signal[last]);
        assert!(m.histogram[last] < 0.0);
    }

    #[test]
    fn no_lookahead_on_truncated_series() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let full = macd(&closes);
        let part = macd(&closes[..50]);
        for i in 0..50 {
            for (a, b) in [
                (full.line[i], part.line[i]),
                (full.signal[i], part.signal[i]),
                (full.histogram[i], part.histogram[i]),
            ] {
                if b.is_nan() {
                    assert!(a.is_nan(), "differs at {i}");
                } else {
                    assert_approx(a, b, DEFAULT_EPSILON);
                }
            }
        }
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let m = macd(&closes);
        for i in 33..70 {
            assert_approx(m.histogram[i], m.line[i] - m.signal[i], DEFAULT_EPSILON);
        }
    }
}

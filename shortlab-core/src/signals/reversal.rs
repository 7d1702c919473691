//! Pump-reversal scanner.
//!
//! Scores the last candle of a short-timeframe series with weighted factors:
//!
//! | factor                 | rule                                            | weight |
//! |------------------------|-------------------------------------------------|--------|
//! | pump                   | (high[t] - low[t-5]) / low[t-5] * 100 >= 8      | 20     |
//! | volume spike           | volume[t] > 3 * mean(volume, last 20)           | 15     |
//! | upper wick             | (high - max(open, close)) / range > 0.45        | 12     |
//! | SFP sweep              | high[t] > high[t-1] and close[t] < high[t-1]    | 15     |
//! | below EMA20            | close[t] < EMA20[t]                             | 10     |
//! | MACD bearish           | line < signal and histogram < 0                 | 10     |
//! | StochRSI rolling over  | stoch[t] > 0.8 and stoch[t] < stoch[t-1]        | 8      |
//! | MFI falling            | mfi[t] > 75 and mfi[t] < mfi[t-1]               | 8      |
//!
//! probability = min(95, floor(1.2 * score)). A timeframe with score >= 35 is a
//! hit; two or more hits confirmed by a 15-minute close below EMA20 make an alert.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Timeframe};
use crate::indicators::{macd, Ema, Indicator, Mfi, StochRsi};

const PUMP_LOOKBACK: usize = 5;
const VOLUME_WINDOW: usize = 20;
const TREND_PERIOD: usize = 20;
const OSCILLATOR_PERIOD: usize = 14;
const MAX_PROBABILITY: u32 = 95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReversalConfig {
    pub pump_pct: f64,
    pub volume_multiple: f64,
    pub wick_ratio: f64,
    pub stoch_overbought: f64,
    pub mfi_overbought: f64,
    /// Per-timeframe score needed to count as a hit.
    pub hit_score: u32,
    pub min_hits: usize,
    pub min_candles: usize,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        Self {
            pump_pct: 8.0,
            volume_multiple: 3.0,
            wick_ratio: 0.45,
            stoch_overbought: 0.8,
            mfi_overbought: 75.0,
            hit_score: 35,
            min_hits: 2,
            min_candles: 50,
        }
    }
}

/// Score of one timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalReport {
    pub score: u32,
    pub probability: u32,
    pub reasons: Vec<String>,
}

/// Multi-timeframe reversal alert for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalAlert {
    pub symbol: String,
    pub price: f64,
    pub score: u32,
    pub probability: u32,
    pub timeframe_hits: Vec<Timeframe>,
    pub reasons: Vec<String>,
}

impl ReversalAlert {
    /// Hit list as stored in the durable log, e.g. `1m,5m`.
    pub fn joined_hits(&self) -> String {
        self.timeframe_hits
            .iter()
            .map(Timeframe::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub fn probability_for(score: u32) -> u32 {
    // floor(1.2 * score) in integer arithmetic
    (score.saturating_mul(6) / 5).min(MAX_PROBABILITY)
}

#[derive(Debug, Clone)]
pub struct ReversalScanner {
    config: ReversalConfig,
    trend: Ema,
    stoch: StochRsi,
    money_flow: Mfi,
}

impl Default for ReversalScanner {
    fn default() -> Self {
        Self::new(ReversalConfig::default())
    }
}

impl ReversalScanner {
    pub fn new(config: ReversalConfig) -> Self {
        Self {
            config,
            trend: Ema::new(TREND_PERIOD),
            stoch: StochRsi::new(OSCILLATOR_PERIOD),
            money_flow: Mfi::new(OSCILLATOR_PERIOD),
        }
    }

    pub fn config(&self) -> &ReversalConfig {
        &self.config
    }

    /// Score the last candle. `None` when fewer than `min_candles` are supplied.
    pub fn score(&self, candles: &[Candle]) -> Option<ReversalReport> {
        let cfg = &self.config;
        if candles.len() < cfg.min_candles.max(PUMP_LOOKBACK + 1) {
            return None;
        }
        let t = candles.len() - 1;
        let last = &candles[t];
        let prev = &candles[t - 1];
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let mut score = 0;
        let mut reasons = Vec::new();
        let mut hit = |fired: bool, weight: u32, reason: String| {
            if fired {
                score += weight;
                reasons.push(reason);
            }
        };

        let base = candles[t - PUMP_LOOKBACK].low;
        let pump = base > 0.0 && (last.high - base) / base * 100.0 >= cfg.pump_pct;
        hit(pump, 20, format!("Pump > {}% in {PUMP_LOOKBACK} candles", cfg.pump_pct));

        let recent = &candles[candles.len().saturating_sub(VOLUME_WINDOW)..];
        let avg_volume = recent.iter().map(|c| c.volume).sum::<f64>() / recent.len() as f64;
        hit(
            last.volume > avg_volume * cfg.volume_multiple,
            15,
            format!("Volume spike x{}", cfg.volume_multiple),
        );

        let range = last.high - last.low;
        let upper_wick = last.high - last.open.max(last.close);
        hit(
            range > 0.0 && upper_wick / range > cfg.wick_ratio,
            12,
            format!("Large upper wick > {:.0}%", cfg.wick_ratio * 100.0),
        );

        hit(
            last.high > prev.high && last.close < prev.high,
            15,
            "SFP high sweep".to_string(),
        );

        let ema = self.trend.compute(candles);
        hit(last.close < ema[t], 10, "Close < EMA20".to_string());

        let m = macd(&closes);
        hit(
            m.line[t] < m.signal[t] && m.histogram[t] < 0.0,
            10,
            "MACD bearish cross".to_string(),
        );

        let stoch = self.stoch.compute(candles);
        hit(
            stoch[t] > cfg.stoch_overbought && stoch[t] < stoch[t - 1],
            8,
            "StochRSI down from overbought".to_string(),
        );

        let flow = self.money_flow.compute(candles);
        hit(
            flow[t] > cfg.mfi_overbought && flow[t] < flow[t - 1],
            8,
            format!("MFI falling from > {}", cfg.mfi_overbought),
        );

        Some(ReversalReport {
            score,
            probability: probability_for(score),
            reasons,
        })
    }

    pub fn is_hit(&self, report: &ReversalReport) -> bool {
        report.score >= self.config.hit_score
    }

    /// True when the confirmation series has enough history and closes below EMA20.
    pub fn trend_confirms(&self, candles: &[Candle]) -> bool {
        if candles.len() < self.config.min_candles {
            return false;
        }
        let ema = self.trend.compute(candles);
        let t = candles.len() - 1;
        candles[t].close < ema[t]
    }

    /// Combine per-timeframe hits into an alert. `None` below `min_hits`.
    pub fn combine(
        &self,
        symbol: &str,
        price: f64,
        hits: Vec<(Timeframe, ReversalReport)>,
    ) -> Option<ReversalAlert> {
        if hits.len() < self.config.min_hits.max(1) {
            return None;
        }
        let count = hits.len() as u32;
        let mut alert = ReversalAlert {
            symbol: symbol.to_string(),
            price,
            score: 0,
            probability: 0,
            timeframe_hits: Vec::with_capacity(hits.len()),
            reasons: Vec::new(),
        };
        let mut probability_sum = 0;
        for (tf, report) in hits {
            alert.score += report.score;
            probability_sum += report.probability;
            alert.timeframe_hits.push(tf);
            alert.reasons.extend(report.reasons);
        }
        alert.probability = (probability_sum / count).min(MAX_PROBABILITY);
        Some(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                timestamp: i as i64 * 60_000,
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 10.0,
            })
            .collect()
    }

    /// Flat history, then a 12% pump candle with a long upper wick and heavy
    /// volume that sweeps the previous high and closes back below it.
    fn pump_and_reject() -> Vec<Candle> {
        let mut candles = flat(60);
        let t = candles.len() - 1;
        candles[t] = Candle {
            timestamp: t as i64 * 60_000,
            open: 100.0,
            high: 112.0,
            low: 99.0,
            close: 99.5,
            volume: 500.0,
        };
        candles
    }

    #[test]
    fn probability_formula() {
        assert_eq!(probability_for(0), 0);
        assert_eq!(probability_for(35), 42);
        assert_eq!(probability_for(41), 49);
        assert_eq!(probability_for(79), 94);
        assert_eq!(probability_for(80), 95);
        assert_eq!(probability_for(98), 95);
    }

    #[test]
    fn flat_series_scores_zero() {
        let report = ReversalScanner::default().score(&flat(60)).unwrap();
        assert_eq!(report.score, 0);
        assert_eq!(report.probability, 0);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn short_series_is_not_scored() {
        assert_eq!(ReversalScanner::default().score(&flat(49)), None);
    }

    #[test]
    fn pump_rejection_is_a_hit() {
        let scanner = ReversalScanner::default();
        let report = scanner.score(&pump_and_reject()).unwrap();
        // pump 20 + volume 15 + wick 12 + sfp 15 + below EMA20 10 + MACD 10
        assert_eq!(report.score, 82);
        assert_eq!(report.probability, 95);
        assert!(scanner.is_hit(&report));
        assert_eq!(report.reasons[0], "Pump > 8% in 5 candles");
    }

    #[test]
    fn trend_confirmation() {
        let scanner = ReversalScanner::default();
        let mut falling = flat(60);
        if let Some(last) = falling.last_mut() {
            last.close = 95.0;
        }
        assert!(scanner.trend_confirms(&falling));

        let mut rising = flat(60);
        if let Some(last) = rising.last_mut() {
            last.close = 105.0;
        }
        assert!(!scanner.trend_confirms(&rising));
        assert!(!scanner.trend_confirms(&falling[..40]));
    }

    #[test]
    fn combine_needs_two_hits() {
        let scanner = ReversalScanner::default();
        let report = ReversalReport {
            score: 40,
            probability: 48,
            reasons: vec!["SFP high sweep".into()],
        };
        assert!(scanner
            .combine("XUSDT", 1.0, vec![(Timeframe::ONE_MINUTE, report.clone())])
            .is_none());

        let other = ReversalReport {
            score: 60,
            probability: 72,
            reasons: vec!["Close < EMA20".into()],
        };
        let alert = scanner
            .combine(
                "XUSDT",
                1.5,
                vec![
                    (Timeframe::ONE_MINUTE, report),
                    (Timeframe::THREE_MINUTES, other),
                ],
            )
            .unwrap();
        assert_eq!(alert.score, 100);
        assert_eq!(alert.probability, 60);
        assert_eq!(alert.joined_hits(), "1m,3m");
        assert_eq!(alert.reasons, vec!["SFP high sweep", "Close < EMA20"]);
    }
}

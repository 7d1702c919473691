//! Short-signal evaluator.
//!
//! Additive scoring over four independent factors, one point each:
//! 1. Overbought: StochRSI > 0.8 or MFI > 80
//! 2. Momentum turn: latest close below the previous close
//! 3. Order-book skew: imbalance < -0.2
//! 4. Support break: latest close below the lowest low of the 20 closed
//!    candles of the secondary (higher) timeframe. The last secondary candle
//!    is still forming and is left out, so the series needs 21 candles.
//!
//! SHORT when the score reaches the threshold (default 3), else HOLD.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    strength_for, CandleSeries, FundingAndOI, OrderBookAggregate, RiskLevel, Signal,
    SignalDecision, Timeframe,
};
use crate::indicators::{latest, Indicator, Mfi, RollingLow, StochRsi};

pub const DEFAULT_SCORE_THRESHOLD: u8 = 3;
pub const MIN_CANDLES: usize = 20;

const OSCILLATOR_PERIOD: usize = 14;
const STOCH_OVERBOUGHT: f64 = 0.8;
const MFI_OVERBOUGHT: f64 = 80.0;
const IMBALANCE_SKEW: f64 = -0.2;
const SUPPORT_WINDOW: usize = 20;
const WIDE_CANDLE_RATIO: f64 = 1.02;
const STOCH_EXTREME: f64 = 0.9;

/// Evaluation was skipped; not an error, the pair simply has nothing to say yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotReady {
    #[error("insufficient history: have {have} candles, need {need}")]
    InsufficientHistory { have: usize, need: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub score_threshold: u8,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

/// Which factors fired. `support_break` carries the timeframe it fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortFactors {
    pub overbought: bool,
    pub momentum_turn: bool,
    pub orderbook_skew: bool,
    pub support_break: Option<Timeframe>,
}

impl ShortFactors {
    pub fn score(&self) -> u8 {
        [
            self.overbought,
            self.momentum_turn,
            self.orderbook_skew,
            self.support_break.is_some(),
        ]
        .into_iter()
        .filter(|&fired| fired)
        .count() as u8
    }

    /// One reason per fired factor, in evaluation order.
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.overbought {
            reasons.push("Overbought (StochRSI / MFI)".to_string());
        }
        if self.momentum_turn {
            reasons.push("Price turning down".to_string());
        }
        if self.orderbook_skew {
            reasons.push("Order book imbalance (asks > bids)".to_string());
        }
        if let Some(tf) = self.support_break {
            reasons.push(format!("Support break on {tf}"));
        }
        reasons
    }
}

#[derive(Debug, Clone)]
pub struct ShortEvaluator {
    config: EvaluatorConfig,
    stoch: StochRsi,
    money_flow: Mfi,
    support: RollingLow,
}

impl Default for ShortEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

impl ShortEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            config,
            stoch: StochRsi::new(OSCILLATOR_PERIOD),
            money_flow: Mfi::new(OSCILLATOR_PERIOD),
            support: RollingLow::new(SUPPORT_WINDOW),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Score the latest candle of `candles`.
    ///
    /// Funding and OI are copied onto the decision untouched.
    pub fn evaluate(
        &self,
        candles: &CandleSeries,
        orderbook: &OrderBookAggregate,
        secondary: Option<&CandleSeries>,
        funding_and_oi: &FundingAndOI,
    ) -> Result<SignalDecision, NotReady> {
        let (factors, stoch) = self.score_factors(candles, orderbook, secondary)?;
        let score = factors.score();
        let signal = if score >= self.config.score_threshold {
            Signal::Short
        } else {
            Signal::Hold
        };

        Ok(SignalDecision {
            symbol: candles.symbol().to_string(),
            timeframe: candles.timeframe(),
            signal,
            score,
            strength: strength_for(score),
            risk_level: risk_level(candles, stoch),
            funding: funding_and_oi.funding_rate,
            oi_change: funding_and_oi.open_interest_change_pct,
            reasons: factors.reasons(),
        })
    }

    pub fn factors(
        &self,
        candles: &CandleSeries,
        orderbook: &OrderBookAggregate,
        secondary: Option<&CandleSeries>,
    ) -> Result<ShortFactors, NotReady> {
        self.score_factors(candles, orderbook, secondary).map(|(factors, _)| factors)
    }

    /// Factors plus the latest StochRSI, which risk grading reuses.
    fn score_factors(
        &self,
        candles: &CandleSeries,
        orderbook: &OrderBookAggregate,
        secondary: Option<&CandleSeries>,
    ) -> Result<(ShortFactors, Option<f64>), NotReady> {
        if candles.len() < MIN_CANDLES {
            return Err(NotReady::InsufficientHistory {
                have: candles.len(),
                need: MIN_CANDLES,
            });
        }

        let last_close = candles.latest_close();
        let stoch = latest(&self.stoch.compute(candles.candles()));
        let money_flow = latest(&self.money_flow.compute(candles.candles()));

        // NaN (not ready) never satisfies a comparison
        let overbought = stoch.is_some_and(|s| s > STOCH_OVERBOUGHT)
            || money_flow.is_some_and(|m| m > MFI_OVERBOUGHT);
        let momentum_turn = candles
            .previous_close()
            .is_some_and(|prev| last_close < prev);
        let orderbook_skew = orderbook.imbalance < IMBALANCE_SKEW;

        let support_break = secondary.and_then(|s| {
            let support = self.closed_support(s)?;
            (last_close < support).then(|| s.timeframe())
        });

        let factors = ShortFactors {
            overbought,
            momentum_turn,
            orderbook_skew,
            support_break,
        };
        Ok((factors, stoch))
    }

    /// Lowest low of the `SUPPORT_WINDOW` candles before the forming one.
    fn closed_support(&self, secondary: &CandleSeries) -> Option<f64> {
        let (_, closed) = secondary.candles().split_last()?;
        latest(&self.support.compute(closed))
    }
}

/// Informational risk: wide latest candle and extreme StochRSI each add one.
///
/// Absent when the latest low is not a positive finite number.
fn risk_level(candles: &CandleSeries, stoch: Option<f64>) -> Option<RiskLevel> {
    let last = candles.last();
    if !(last.low.is_finite() && last.low > 0.0) {
        return None;
    }
    let mut count = 0u8;
    if last.high / last.low > WIDE_CANDLE_RATIO {
        count += 1;
    }
    if stoch.is_some_and(|s| s > STOCH_EXTREME) {
        count += 1;
    }
    Some(RiskLevel::from_count(count))
}

//! Trailing 24h growth gate.
//!
//! A SHORT only makes sense after a pump. If the instrument has not grown by at
//! least the threshold over the trailing 24 hours, the SHORT is downgraded to
//! HOLD with one appended reason. HOLD decisions pass through untouched, so
//! applying the gate twice is the same as applying it once.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Signal, SignalDecision};

pub const DEFAULT_MIN_GROWTH_PCT: f64 = 15.0;
pub const GROWTH_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// What to do with a SHORT whose 24h growth cannot be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingHistoryPolicy {
    /// Downgrade to HOLD (fail closed).
    #[default]
    Suppress,
    /// Let the SHORT through (fail open).
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthGate {
    pub min_growth_pct: f64,
    pub missing_history: MissingHistoryPolicy,
}

impl Default for GrowthGate {
    fn default() -> Self {
        Self {
            min_growth_pct: DEFAULT_MIN_GROWTH_PCT,
            missing_history: MissingHistoryPolicy::default(),
        }
    }
}

impl GrowthGate {
    pub fn new(min_growth_pct: f64, missing_history: MissingHistoryPolicy) -> Self {
        Self {
            min_growth_pct,
            missing_history,
        }
    }

    pub fn apply(&self, mut decision: SignalDecision, growth_pct: Option<f64>) -> SignalDecision {
        if decision.signal != Signal::Short {
            return decision;
        }
        let threshold = self.min_growth_pct;
        let reason = match growth_pct {
            Some(g) if g >= threshold => return decision,
            Some(g) => format!("Growth gate: 24h growth {g:.2}% below {threshold}% minimum"),
            None => match self.missing_history {
                MissingHistoryPolicy::Allow => return decision,
                MissingHistoryPolicy::Suppress => {
                    format!("Growth gate: 24h growth unavailable (need {threshold}% minimum)")
                }
            },
        };
        decision.signal = Signal::Hold;
        decision.reasons.push(reason);
        decision
    }
}

/// Gate with the default (fail closed) missing-history policy.
pub fn apply_gate(
    decision: SignalDecision,
    growth_pct: Option<f64>,
    min_growth_pct: f64,
) -> SignalDecision {
    GrowthGate::new(min_growth_pct, MissingHistoryPolicy::Suppress).apply(decision, growth_pct)
}

/// Percent growth from the oldest minute candle inside the trailing 24h window
/// to `latest_close`.
///
/// `None` when no candle falls inside the window or its close is not positive.
pub fn trailing_growth_pct(minute_candles: &[Candle], latest_close: f64, now_ms: i64) -> Option<f64> {
    let cutoff = now_ms - GROWTH_WINDOW_MS;
    let base = minute_candles
        .iter()
        .filter(|c| c.timestamp >= cutoff)
        .min_by_key(|c| c.timestamp)?;
    if !(base.close.is_finite() && base.close > 0.0) {
        return None;
    }
    Some((latest_close - base.close) / base.close * 100.0)
}

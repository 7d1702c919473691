//! Signal decision: the output record of one evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::candle::Timeframe;

/// Points of strength per triggered factor.
pub const STRENGTH_PER_POINT: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Short,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Short => f.write_str("SHORT"),
            Signal::Hold => f.write_str("HOLD"),
        }
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SHORT" => Ok(Signal::Short),
            "HOLD" => Ok(Signal::Hold),
            other => Err(format!("unknown signal '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a risk counter: 0 → LOW, 1 → MEDIUM, 2+ → HIGH.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("LOW"),
            RiskLevel::Medium => f.write_str("MEDIUM"),
            RiskLevel::High => f.write_str("HIGH"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

/// Coarse confidence proxy: min(100, score × 25). Not a probability.
pub fn strength_for(score: u8) -> u8 {
    score.saturating_mul(STRENGTH_PER_POINT).min(100)
}

/// Result of one short-signal evaluation.
///
/// `reasons` holds one entry per triggered factor in evaluation order; the
/// growth gate may append one more when it downgrades a SHORT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub signal: Signal,
    /// Raw count of triggered factors.
    pub score: u8,
    pub strength: u8,
    pub risk_level: Option<RiskLevel>,
    /// Raw funding fraction, passed through unmodified.
    pub funding: Option<f64>,
    /// Open-interest change in percent, passed through unmodified.
    pub oi_change: Option<f64>,
    pub reasons: Vec<String>,
}

impl SignalDecision {
    pub fn is_short(&self) -> bool {
        self.signal == Signal::Short
    }

    /// Reasons joined the way the durable log stores them.
    pub fn joined_reasons(&self) -> String {
        self.reasons.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_is_capped() {
        assert_eq!(strength_for(0), 0);
        assert_eq!(strength_for(1), 25);
        assert_eq!(strength_for(3), 75);
        assert_eq!(strength_for(4), 100);
        assert_eq!(strength_for(7), 100);
        assert_eq!(strength_for(u8::MAX), 100);
    }

    #[test]
    fn risk_from_count() {
        assert_eq!(RiskLevel::from_count(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_count(1), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_count(2), RiskLevel::High);
        assert_eq!(RiskLevel::from_count(5), RiskLevel::High);
    }

    #[test]
    fn signal_text_roundtrip() {
        for s in [Signal::Short, Signal::Hold] {
            assert_eq!(s.to_string().parse::<Signal>().unwrap(), s);
        }
        assert!("BUY".parse::<Signal>().is_err());
    }

    #[test]
    fn risk_text_roundtrip() {
        for r in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert_eq!(r.to_string().parse::<RiskLevel>().unwrap(), r);
        }
    }

    #[test]
    fn decision_serializes_signal_uppercase() {
        let decision = SignalDecision {
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::FIVE_MINUTES,
            signal: Signal::Short,
            score: 3,
            strength: 75,
            risk_level: Some(RiskLevel::Medium),
            funding: Some(0.0001),
            oi_change: None,
            reasons: vec!["a".into(), "b".into()],
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"SHORT\""));
        assert!(json.contains("\"timeframe\":5"));
        assert_eq!(decision.joined_reasons(), "a; b");
    }
}

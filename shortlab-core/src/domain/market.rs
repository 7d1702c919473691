//! Per-poll market context: top-of-book liquidity and derivatives data.

use serde::{Deserialize, Serialize};

/// Epsilon added to every denominator that can be zero.
pub const EPSILON: f64 = 1e-9;

/// Aggregated top-of-book liquidity.
///
/// `imbalance` = (bid - ask) / (bid + ask + ε), so it lies in [-1, 1] and is
/// 0 for an empty book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookAggregate {
    pub bid_liquidity: f64,
    pub ask_liquidity: f64,
    pub imbalance: f64,
}

impl OrderBookAggregate {
    pub fn new(bid_liquidity: f64, ask_liquidity: f64) -> Self {
        let bid_liquidity = bid_liquidity.max(0.0);
        let ask_liquidity = ask_liquidity.max(0.0);
        Self {
            bid_liquidity,
            ask_liquidity,
            imbalance: (bid_liquidity - ask_liquidity) / (bid_liquidity + ask_liquidity + EPSILON),
        }
    }

    /// Sum the sizes of the best `depth` levels on each side.
    ///
    /// Levels are `(price, size)` pairs ordered best first.
    pub fn from_levels(bids: &[(f64, f64)], asks: &[(f64, f64)], depth: usize) -> Self {
        let sum = |levels: &[(f64, f64)]| -> f64 {
            levels
                .iter()
                .take(depth)
                .map(|&(_, size)| size)
                .filter(|s| s.is_finite() && *s > 0.0)
                .sum()
        };
        Self::new(sum(bids), sum(asks))
    }
}

/// Funding rate and open-interest change. Each field is independently optional;
/// absence means the source had no data this cycle.
///
/// `funding_rate` is the raw fraction reported by the exchange (0.0001 = 0.01%).
/// `open_interest_change_pct` is already a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingAndOI {
    pub funding_rate: Option<f64>,
    pub open_interest_change_pct: Option<f64>,
}

impl FundingAndOI {
    pub fn absent() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imbalance_sign_follows_dominant_side() {
        let book = OrderBookAggregate::new(35.0, 65.0);
        assert!((book.imbalance - (-0.3)).abs() < 1e-9);
        let book = OrderBookAggregate::new(80.0, 20.0);
        assert!((book.imbalance - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_book_has_zero_imbalance() {
        let book = OrderBookAggregate::new(0.0, 0.0);
        assert_eq!(book.imbalance, 0.0);
    }

    #[test]
    fn from_levels_only_sums_requested_depth() {
        let bids: Vec<(f64, f64)> = (0..20).map(|i| (100.0 - i as f64, 1.0)).collect();
        let asks: Vec<(f64, f64)> = (0..20).map(|i| (101.0 + i as f64, 2.0)).collect();
        let book = OrderBookAggregate::from_levels(&bids, &asks, 10);
        assert_eq!(book.bid_liquidity, 10.0);
        assert_eq!(book.ask_liquidity, 20.0);
        assert!(book.imbalance < 0.0);
    }

    #[test]
    fn imbalance_stays_in_range() {
        for (b, a) in [(0.0, 5.0), (5.0, 0.0), (1e12, 1e-12)] {
            let book = OrderBookAggregate::new(b, a);
            assert!((-1.0..=1.0).contains(&book.imbalance));
        }
    }
}

//! Domain types for shortlab

pub mod candle;
pub mod decision;
pub mod market;

pub use candle::{Candle, CandleError, CandleSeries, Timeframe};
pub use decision::{strength_for, RiskLevel, Signal, SignalDecision, STRENGTH_PER_POINT};
pub use market::{FundingAndOI, OrderBookAggregate, EPSILON};

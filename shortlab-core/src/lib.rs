//! shortlab core: domain types, indicators, short-signal scoring, growth gate,
//! reversal scoring, and market data providers.
//!
//! This crate holds everything that decides *whether* to emit a signal:
//! - Domain types (candles, order book aggregates, funding/OI, decisions)
//! - Indicator library (EMA, MACD, StochRSI, MFI, rolling low)
//! - Short evaluator and trailing growth gate
//! - Multi-timeframe reversal scoring
//! - Async market snapshot provider trait and the Bybit client
//!
//! Scheduling, notification and the durable log live in `shortlab-runner`.

pub mod data;
pub mod domain;
pub mod indicators;
pub mod signals;

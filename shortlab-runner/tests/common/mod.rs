//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use shortlab_core::data::{DataError, MarketDataProvider};
use shortlab_core::domain::{
    Candle, CandleSeries, FundingAndOI, OrderBookAggregate, SignalDecision, Timeframe,
};
use shortlab_core::signals::ReversalAlert;
use shortlab_runner::notifier::{DeliveryError, Notifier};

// ── Provider ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryProvider {
    candles: HashMap<(String, Timeframe), Vec<Candle>>,
    books: HashMap<String, OrderBookAggregate>,
    funding: HashMap<String, FundingAndOI>,
    universe: Vec<(String, f64)>,
    failing: HashSet<String>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, symbol: &str, tf: Timeframe, candles: Vec<Candle>) -> Self {
        self.candles.insert((symbol.to_string(), tf), candles);
        self
    }

    pub fn with_book(mut self, symbol: &str, bid: f64, ask: f64) -> Self {
        self.books
            .insert(symbol.to_string(), OrderBookAggregate::new(bid, ask));
        self
    }

    pub fn with_funding(mut self, symbol: &str, funding: FundingAndOI) -> Self {
        self.funding.insert(symbol.to_string(), funding);
        self
    }

    pub fn with_turnover(mut self, symbol: &str, turnover: f64) -> Self {
        self.universe.push((symbol.to_string(), turnover));
        self
    }

    /// Every fetch for `symbol` fails as if the exchange were unreachable.
    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), DataError> {
        if self.failing.contains(symbol) {
            return Err(DataError::NetworkUnreachable(format!("{symbol} is down")));
        }
        Ok(())
    }

    fn stored(&self, symbol: &str, tf: Timeframe) -> Result<&Vec<Candle>, DataError> {
        self.candles
            .get(&(symbol.to_string(), tf))
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("no {tf} klines for {symbol}")))
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, DataError> {
        self.check(symbol)?;
        let all = self.stored(symbol, timeframe)?;
        let start = all.len().saturating_sub(limit);
        Ok(CandleSeries::new(symbol, timeframe, all[start..].to_vec())?)
    }

    async fn get_candles_since(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
    ) -> Result<CandleSeries, DataError> {
        self.check(symbol)?;
        let window: Vec<Candle> = self
            .stored(symbol, timeframe)?
            .iter()
            .filter(|c| c.timestamp >= since_ms)
            .copied()
            .collect();
        Ok(CandleSeries::new(symbol, timeframe, window)?)
    }

    async fn get_orderbook_aggregate(
        &self,
        symbol: &str,
        _depth: usize,
    ) -> Result<OrderBookAggregate, DataError> {
        self.check(symbol)?;
        Ok(self
            .books
            .get(symbol)
            .copied()
            .unwrap_or_else(|| OrderBookAggregate::new(1.0, 1.0)))
    }

    async fn get_funding_and_oi(&self, symbol: &str) -> FundingAndOI {
        self.funding.get(symbol).copied().unwrap_or_default()
    }

    async fn list_symbols_below_turnover(
        &self,
        max_turnover: f64,
    ) -> Result<Vec<String>, DataError> {
        let mut symbols: Vec<String> = self
            .universe
            .iter()
            .filter(|(_, t)| *t < max_turnover)
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

// ── Notifier ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct CapturingNotifier {
    pub decisions: Mutex<Vec<(SignalDecision, f64)>>,
    pub alerts: Mutex<Vec<ReversalAlert>>,
    fail: bool,
}

impl CapturingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures nothing and rejects every message.
    pub fn rejecting() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn notified_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .decisions
            .lock()
            .unwrap()
            .iter()
            .map(|(d, _)| d.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    fn rejection(&self) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Rejected {
                status: 400,
                description: "chat not found".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn notify(&self, decision: &SignalDecision, price: f64) -> Result<(), DeliveryError> {
        self.rejection()?;
        self.decisions
            .lock()
            .unwrap()
            .push((decision.clone(), price));
        Ok(())
    }

    async fn notify_reversal(&self, alert: &ReversalAlert) -> Result<(), DeliveryError> {
        self.rejection()?;
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

// ── Candle builders ──────────────────────────────────────────────────

pub fn candle(timestamp: i64, open: f64, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp,
        open,
        high: open.max(close) + 0.5,
        low: open.min(close) - 0.5,
        close,
        volume,
    }
}

/// 30 rising high-volume minutes then a sharp drop on almost no volume,
/// ending one minute before `now_ms`. Scores overbought + turning down.
pub fn pump_then_drop(now_ms: i64) -> Vec<Candle> {
    let start = now_ms - 31 * 60_000;
    let mut candles: Vec<Candle> = (0..30)
        .map(|i| {
            let close = 100.0 + i as f64;
            candle(start + i * 60_000, close - 1.0, close, 1000.0)
        })
        .collect();
    candles.push(candle(start + 30 * 60_000, 129.0, 120.0, 1.0));
    candles
}

/// Strictly increasing closes with shrinking steps and no volume.
pub fn quiet_uptrend(now_ms: i64) -> Vec<Candle> {
    let start = now_ms - 40 * 60_000;
    (0..40)
        .map(|i| {
            let c = 100.0 + 10.0 * (i as f64).sqrt();
            Candle {
                timestamp: start + i * 60_000,
                open: c,
                high: c + 0.1,
                low: c - 0.1,
                close: c,
                volume: 0.0,
            }
        })
        .collect()
}

pub fn flat(n: usize, price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle {
            timestamp: i as i64 * 60_000,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 10.0,
        })
        .collect()
}

/// Flat history, then a 12% wick on heavy volume that closes back below the
/// previous high.
pub fn pump_and_reject() -> Vec<Candle> {
    let mut candles = flat(60, 100.0);
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

/// Flat series whose last close sits `delta` away from the rest.
pub fn flat_then(n: usize, delta: f64) -> Vec<Candle> {
    let mut candles = flat(n, 100.0);
    if let Some(last) = candles.last_mut() {
        last.close += delta;
        last.high = last.high.max(last.close);
        last.low = last.low.min(last.close);
    }
    candles
}

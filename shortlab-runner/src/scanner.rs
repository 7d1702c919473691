//! Reversal scanner loop.
//!
//! Walks a low-turnover universe one symbol at a time, scores each configured
//! timeframe, and alerts when enough timeframes hit and the confirmation
//! timeframe trades below its EMA20.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use shortlab_core::data::{DataError, MarketDataProvider};
use shortlab_core::domain::Timeframe;
use shortlab_core::signals::{ReversalAlert, ReversalScanner};

use crate::config::AppConfig;
use crate::notifier::Notifier;
use crate::recorder::{RecorderHandle, SignalRecord};

#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Fixed universe; empty means "query the exchange every sweep".
    pub symbols: Vec<String>,
    pub max_turnover_24h: f64,
    pub timeframes: Vec<Timeframe>,
    pub confirm_timeframe: Timeframe,
    pub candle_limit: usize,
    pub symbol_delay: Duration,
    pub interval: Duration,
    pub max_sweeps: Option<u64>,
    pub scanner: ReversalScanner,
}

impl ScannerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let scan = &config.scanner;
        let mut timeframes = scan.timeframes.clone();
        timeframes.sort();
        timeframes.dedup();
        Self {
            symbols: scan.symbols.clone(),
            max_turnover_24h: scan.max_turnover_24h,
            timeframes,
            confirm_timeframe: scan.confirm_timeframe,
            candle_limit: scan.candle_limit,
            symbol_delay: Duration::from_millis(scan.symbol_delay_ms),
            interval: Duration::from_secs(scan.interval_secs),
            max_sweeps: config.max_cycles,
            scanner: ReversalScanner::new(scan.scoring.clone()),
        }
    }
}

/// Score one symbol across the configured timeframes.
///
/// The alert price is the latest close of the shortest timeframe. The
/// confirmation series is only fetched once enough timeframes have hit.
pub async fn scan_symbol(
    provider: &dyn MarketDataProvider,
    settings: &ScannerSettings,
    symbol: &str,
) -> Result<Option<ReversalAlert>, DataError> {
    let scanner = &settings.scanner;
    let mut price = None;
    let mut hits = Vec::new();

    for &tf in &settings.timeframes {
        let series = provider.get_candles(symbol, tf, settings.candle_limit).await?;
        price.get_or_insert(series.latest_close());
        let Some(report) = scanner.score(series.candles()) else {
            debug!(symbol, timeframe = %tf, candles = series.len(), "not enough history to score");
            continue;
        };
        if scanner.is_hit(&report) {
            debug!(symbol, timeframe = %tf, score = report.score, "timeframe hit");
            hits.push((tf, report));
        }
    }

    if hits.len() < scanner.config().min_hits {
        return Ok(None);
    }
    let confirm = provider
        .get_candles(symbol, settings.confirm_timeframe, settings.candle_limit)
        .await?;
    if !scanner.trend_confirms(confirm.candles()) {
        debug!(symbol, "confirmation timeframe not below EMA20");
        return Ok(None);
    }
    Ok(price.and_then(|p| scanner.combine(symbol, p, hits)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub symbols: usize,
    pub alerts: usize,
    pub failed: usize,
}

pub struct ReversalScanLoop {
    provider: Arc<dyn MarketDataProvider>,
    notifier: Arc<dyn Notifier>,
    recorder: RecorderHandle,
    settings: ScannerSettings,
}

impl ReversalScanLoop {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
        recorder: RecorderHandle,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            provider,
            notifier,
            recorder,
            settings,
        }
    }

    async fn universe(&self) -> Result<Vec<String>, DataError> {
        if !self.settings.symbols.is_empty() {
            return Ok(self.settings.symbols.clone());
        }
        self.provider
            .list_symbols_below_turnover(self.settings.max_turnover_24h)
            .await
    }

    /// One pass over the universe.
    pub async fn sweep(&self) -> Result<SweepReport, DataError> {
        let symbols = self.universe().await?;
        info!(symbols = symbols.len(), "reversal sweep started");
        let mut report = SweepReport {
            symbols: symbols.len(),
            ..SweepReport::default()
        };

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.settings.symbol_delay.is_zero() {
                tokio::time::sleep(self.settings.symbol_delay).await;
            }
            match scan_symbol(self.provider.as_ref(), &self.settings, symbol).await {
                Ok(Some(alert)) => {
                    report.alerts += 1;
                    self.dispatch(&alert).await;
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(symbol = %symbol, error = %e, "symbol scan failed");
                }
            }
        }
        Ok(report)
    }

    async fn dispatch(&self, alert: &ReversalAlert) {
        info!(
            symbol = %alert.symbol,
            score = alert.score,
            probability = alert.probability,
            hits = %alert.joined_hits(),
            "reversal alert"
        );
        if let Err(e) = self.notifier.notify_reversal(alert).await {
            warn!(symbol = %alert.symbol, error = %e, "reversal notification failed");
        }
        let record = SignalRecord::from_alert(Utc::now(), alert);
        if let Err(e) = self.recorder.record(record).await {
            error!(symbol = %alert.symbol, error = %e, "failed to record reversal alert");
        }
    }

    /// Sweep until `max_sweeps` is reached (forever when unset). A failed
    /// sweep is logged and the loop carries on.
    pub async fn run(&self) -> u64 {
        let mut completed = 0u64;
        loop {
            match self.sweep().await {
                Ok(report) => info!(
                    symbols = report.symbols,
                    alerts = report.alerts,
                    failed = report.failed,
                    "reversal sweep complete"
                ),
                Err(e) => error!(error = %e, "reversal sweep failed"),
            }
            completed += 1;
            if self.settings.max_sweeps.is_some_and(|max| completed >= max) {
                return completed;
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }
}

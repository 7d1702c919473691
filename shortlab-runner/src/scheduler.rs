//! Poll-cycle scheduler.
//!
//! Each cycle spawns one task per (symbol, timeframe) pair. A task fetches its
//! snapshots, evaluates, applies the growth gate, then notifies and records.
//! Pairs share no mutable state; a failed or panicking pair is logged and
//! counted without affecting the rest of the cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use shortlab_core::data::{DataError, MarketDataProvider};
use shortlab_core::domain::{SignalDecision, Timeframe};
use shortlab_core::signals::{
    trailing_growth_pct, GrowthGate, NotReady, ShortEvaluator, GROWTH_WINDOW_MS,
};

use crate::config::AppConfig;
use crate::notifier::Notifier;
use crate::recorder::RecorderHandle;

/// Everything a pair task needs, resolved once from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub support_timeframe: Option<Timeframe>,
    pub candle_limit: usize,
    pub book_depth: usize,
    pub evaluator: ShortEvaluator,
    pub gate: GrowthGate,
    pub notify_holds: bool,
    pub poll_interval: Duration,
    pub max_cycles: Option<u64>,
}

impl SchedulerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            symbols: config.symbols.clone(),
            timeframes: config.timeframes.clone(),
            support_timeframe: config.support_timeframe,
            candle_limit: config.candle_limit,
            book_depth: config.book_depth,
            evaluator: ShortEvaluator::new(config.evaluator_config()),
            gate: config.growth_gate,
            notify_holds: config.notify_holds,
            poll_interval: config.poll_interval(),
            max_cycles: config.max_cycles,
        }
    }

    pub fn pairs(&self) -> Vec<(String, Timeframe)> {
        self.symbols
            .iter()
            .flat_map(|s| self.timeframes.iter().map(move |tf| (s.clone(), *tf)))
            .collect()
    }
}

/// Why a pair produced no decision this cycle.
#[derive(Debug, Error)]
pub enum PairError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    NotReady(#[from] NotReady),
}

/// Fetch, evaluate and gate one pair. Returns the decision and the latest close.
///
/// The support series is optional context: if it cannot be fetched the
/// support-break factor is simply not evaluated. The 24h minute window is only
/// fetched for SHORT candidates.
pub async fn evaluate_pair(
    provider: &dyn MarketDataProvider,
    settings: &SchedulerSettings,
    symbol: &str,
    timeframe: Timeframe,
    now_ms: i64,
) -> Result<(SignalDecision, f64), PairError> {
    let support = async {
        match settings.support_timeframe {
            Some(tf) => match provider.get_candles(symbol, tf, settings.candle_limit).await {
                Ok(series) => Some(series),
                Err(e) => {
                    warn!(symbol, timeframe = %tf, error = %e, "support series unavailable");
                    None
                }
            },
            None => None,
        }
    };
    let (primary, book, secondary, funding) = tokio::join!(
        provider.get_candles(symbol, timeframe, settings.candle_limit),
        provider.get_orderbook_aggregate(symbol, settings.book_depth),
        support,
        provider.get_funding_and_oi(symbol),
    );
    let primary = primary?;
    let book = book?;

    let decision = settings
        .evaluator
        .evaluate(&primary, &book, secondary.as_ref(), &funding)?;
    let price = primary.latest_close();

    if !decision.is_short() {
        return Ok((decision, price));
    }

    let growth = match provider
        .get_candles_since(symbol, Timeframe::ONE_MINUTE, now_ms - GROWTH_WINDOW_MS)
        .await
    {
        Ok(window) => trailing_growth_pct(window.candles(), price, now_ms),
        Err(e) => {
            warn!(symbol, error = %e, "24h history unavailable for growth gate");
            None
        }
    };
    debug!(symbol, timeframe = %timeframe, growth = ?growth, "growth gate input");
    Ok((settings.gate.apply(decision, growth), price))
}

/// Counters for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pairs: usize,
    pub decisions: usize,
    pub shorts: usize,
    /// Pairs without enough history.
    pub skipped: usize,
    /// Pairs whose fetch failed or whose task panicked.
    pub failed: usize,
}

enum PairOutcome {
    Decided { short: bool },
    NotReady,
    Failed,
}

pub struct Scheduler {
    provider: Arc<dyn MarketDataProvider>,
    notifier: Arc<dyn Notifier>,
    recorder: RecorderHandle,
    settings: Arc<SchedulerSettings>,
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
        recorder: RecorderHandle,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            provider,
            notifier,
            recorder,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Run exactly one poll cycle over every configured pair.
    pub async fn run_cycle(&self) -> CycleReport {
        let pairs = self.settings.pairs();
        let mut report = CycleReport {
            pairs: pairs.len(),
            ..CycleReport::default()
        };

        let mut tasks = JoinSet::new();
        for (symbol, timeframe) in pairs {
            let provider = Arc::clone(&self.provider);
            let notifier = Arc::clone(&self.notifier);
            let recorder = self.recorder.clone();
            let settings = Arc::clone(&self.settings);
            tasks.spawn(async move {
                process_pair(
                    provider.as_ref(),
                    notifier.as_ref(),
                    &recorder,
                    &settings,
                    &symbol,
                    timeframe,
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(PairOutcome::Decided { short }) => {
                    report.decisions += 1;
                    if short {
                        report.shorts += 1;
                    }
                }
                Ok(PairOutcome::NotReady) => report.skipped += 1,
                Ok(PairOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "pair task panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Run cycles until `max_cycles` is reached (forever when unset).
    /// Returns the number of completed cycles.
    pub async fn run(&self) -> u64 {
        let mut completed = 0u64;
        loop {
            let report = self.run_cycle().await;
            completed += 1;
            info!(
                cycle = completed,
                pairs = report.pairs,
                decisions = report.decisions,
                shorts = report.shorts,
                skipped = report.skipped,
                failed = report.failed,
                "cycle complete"
            );
            if self.settings.max_cycles.is_some_and(|max| completed >= max) {
                return completed;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

async fn process_pair(
    provider: &dyn MarketDataProvider,
    notifier: &dyn Notifier,
    recorder: &RecorderHandle,
    settings: &SchedulerSettings,
    symbol: &str,
    timeframe: Timeframe,
) -> PairOutcome {
    let now = Utc::now();
    let (decision, price) =
        match evaluate_pair(provider, settings, symbol, timeframe, now.timestamp_millis()).await {
            Ok(found) => found,
            Err(PairError::NotReady(reason)) => {
                debug!(symbol, timeframe = %timeframe, %reason, "pair not ready");
                return PairOutcome::NotReady;
            }
            Err(PairError::Data(e)) => {
                warn!(symbol, timeframe = %timeframe, error = %e, "pair skipped");
                return PairOutcome::Failed;
            }
        };

    let short = decision.is_short();
    info!(
        symbol,
        timeframe = %timeframe,
        signal = %decision.signal,
        strength = decision.strength,
        price,
        "decision"
    );

    if short || settings.notify_holds {
        if let Err(e) = notifier.notify(&decision, price).await {
            warn!(symbol, timeframe = %timeframe, error = %e, "notification failed");
        }
    }
    if let Err(e) = recorder.append(now, symbol, price, &decision).await {
        error!(symbol, timeframe = %timeframe, error = %e, "failed to record decision");
    }
    PairOutcome::Decided { short }
}

//! shortlab CLI: signal daemon, reversal scanner, one-off checks and the log.
//!
//! Commands:
//! - `run`: poll the configured pairs and emit SHORT/HOLD signals
//! - `scan`: sweep the low-turnover universe for pump reversals
//! - `check`: evaluate one symbol once and print the decision as JSON
//! - `log`: print the most recent rows of the signal log

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shortlab_core::data::{BybitProvider, MarketDataProvider};
use shortlab_core::domain::Timeframe;
use shortlab_runner::{
    evaluate_pair, read_records, AppConfig, LogNotifier, Notifier, Recorder, RecorderHandle,
    ReversalScanLoop, ScannerSettings, Scheduler, SchedulerSettings, TelegramNotifier,
};

#[derive(Parser)]
#[command(
    name = "shortlab",
    about = "shortlab: short-signal and pump-reversal alerts for Bybit USDT perpetuals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the short-signal daemon.
    Run {
        /// Path to a TOML config file. Defaults to $SHORTLAB_CONFIG or ./shortlab.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log notifications instead of sending them to Telegram.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Run the reversal scanner daemon.
    Scan {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log alerts instead of sending them to Telegram.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Evaluate one symbol once. Nothing is notified or recorded.
    Check {
        /// Symbol, e.g. BTCUSDT.
        symbol: String,

        /// Timeframe in minutes. Defaults to the first configured timeframe.
        #[arg(long)]
        timeframe: Option<u32>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the most recent recorded signals.
    Log {
        /// Signal log path. Defaults to the configured log_path.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Number of rows to show.
        #[arg(long, default_value_t = 20)]
        tail: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            cycles,
        } => run_daemon(config.as_deref(), dry_run, cycles).await,
        Commands::Scan { config, dry_run } => run_scanner(config.as_deref(), dry_run).await,
        Commands::Check {
            symbol,
            timeframe,
            config,
        } => run_check(config.as_deref(), &symbol, timeframe).await,
        Commands::Log { path, tail } => run_log(path, tail),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>, dry_run: bool) -> Result<AppConfig> {
    let config = AppConfig::load(path).context("failed to load configuration")?;
    config.validate(dry_run).context("invalid configuration")?;
    Ok(config)
}

fn build_provider(config: &AppConfig) -> Result<Arc<BybitProvider>> {
    let provider = BybitProvider::new(config.base_url.clone(), config.request_timeout())
        .context("failed to build Bybit client")?;
    Ok(Arc::new(provider))
}

fn build_notifier(config: &AppConfig, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run {
        info!("dry run: notifications go to the log");
        return Ok(Arc::new(LogNotifier));
    }
    let token = config
        .telegram
        .bot_token
        .clone()
        .context("Telegram bot token missing")?;
    let chat_id = config
        .telegram
        .chat_id
        .clone()
        .context("Telegram chat id missing")?;
    let notifier = TelegramNotifier::new(token, chat_id, config.request_timeout())
        .context("failed to build Telegram client")?;
    Ok(Arc::new(notifier))
}

async fn run_daemon(config_path: Option<&Path>, dry_run: bool, cycles: Option<u64>) -> Result<()> {
    let mut config = load_config(config_path, dry_run)?;
    if cycles.is_some() {
        config.max_cycles = cycles;
    }

    let provider = build_provider(&config)?;
    let notifier = build_notifier(&config, dry_run)?;
    let (recorder, recorder_task) = RecorderHandle::spawn(Recorder::new(&config.log_path));
    let settings = SchedulerSettings::from_config(&config);
    info!(
        provider = provider.name(),
        pairs = settings.pairs().len(),
        log = %config.log_path.display(),
        "signal daemon starting"
    );
    let scheduler = Scheduler::new(provider, notifier, recorder, settings);

    tokio::select! {
        completed = scheduler.run() => info!(cycles = completed, "signal daemon finished"),
        _ = tokio::signal::ctrl_c() => info!("received Ctrl-C, shutting down"),
    }

    drop(scheduler);
    recorder_task.await.context("recorder task failed")?;
    Ok(())
}

async fn run_scanner(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = load_config(config_path, dry_run)?;
    let provider = build_provider(&config)?;
    let notifier = build_notifier(&config, dry_run)?;
    let (recorder, recorder_task) = RecorderHandle::spawn(Recorder::new(&config.log_path));
    let settings = ScannerSettings::from_config(&config);
    info!(
        max_turnover = settings.max_turnover_24h,
        timeframes = settings.timeframes.len(),
        "reversal scanner starting"
    );
    let scan_loop = ReversalScanLoop::new(provider, notifier, recorder, settings);

    tokio::select! {
        sweeps = scan_loop.run() => info!(sweeps, "reversal scanner finished"),
        _ = tokio::signal::ctrl_c() => info!("received Ctrl-C, shutting down"),
    }

    drop(scan_loop);
    recorder_task.await.context("recorder task failed")?;
    Ok(())
}

async fn run_check(config_path: Option<&Path>, symbol: &str, timeframe: Option<u32>) -> Result<()> {
    let config = load_config(config_path, true)?;
    let timeframe = match timeframe {
        Some(minutes) if minutes > 0 => Timeframe::minutes(minutes),
        Some(_) => anyhow::bail!("--timeframe must be at least 1 minute"),
        None => config
            .timeframes
            .first()
            .copied()
            .context("no timeframes configured")?,
    };

    let provider = build_provider(&config)?;
    let settings = SchedulerSettings::from_config(&config);
    let symbol = symbol.to_uppercase();
    let (decision, price) = evaluate_pair(
        provider.as_ref(),
        &settings,
        &symbol,
        timeframe,
        Utc::now().timestamp_millis(),
    )
    .await
    .with_context(|| format!("could not evaluate {symbol} on {timeframe}"))?;

    let output = serde_json::json!({
        "price": price,
        "decision": decision,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to serialize decision")?
    );
    Ok(())
}

fn run_log(path: Option<PathBuf>, tail: usize) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => AppConfig::load(None)
            .context("failed to load configuration")?
            .log_path,
    };
    let records = read_records(&path)
        .with_context(|| format!("failed to read signal log {}", path.display()))?;
    if records.is_empty() {
        warn!(path = %path.display(), "signal log is empty");
        println!("No signals recorded in {}", path.display());
        return Ok(());
    }

    let start = records.len().saturating_sub(tail);
    println!(
        "{:<19}  {:<14} {:<8} {:>14} {:<5} {:>4} {:<6}  Reasons",
        "Timestamp", "Symbol", "TF", "Price", "Sig", "Str", "Risk"
    );
    println!("{}", "-".repeat(90));
    for r in &records[start..] {
        let risk = r
            .risk_level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:<19}  {:<14} {:<8} {:>14} {:<5} {:>3}% {:<6}  {}",
            r.timestamp,
            r.symbol,
            r.timeframe,
            r.price,
            r.signal.to_string(),
            r.strength,
            risk,
            r.reasons
        );
    }
    println!("{} of {} rows", records.len() - start, records.len());
    Ok(())
}

//! shortlab runner: everything around the scoring core that touches the
//! outside world on a schedule.
//!
//! This crate builds on `shortlab-core` to provide:
//! - Configuration (`shortlab.toml` + environment secrets)
//! - The poll-cycle scheduler for short signals
//! - The reversal scanner loop over a low-turnover universe
//! - Telegram and log notifiers
//! - The append-only CSV signal log

pub mod config;
pub mod notifier;
pub mod recorder;
pub mod scanner;
pub mod scheduler;

pub use config::{AppConfig, ConfigError, ScannerConfig, TelegramConfig};
pub use notifier::{
    format_decision, format_reversal, DeliveryError, LogNotifier, Notifier, TelegramNotifier,
};
pub use recorder::{read_records, RecordError, Recorder, RecorderHandle, SignalRecord};
pub use scanner::{scan_symbol, ReversalScanLoop, ScannerSettings, SweepReport};
pub use scheduler::{evaluate_pair, CycleReport, PairError, Scheduler, SchedulerSettings};

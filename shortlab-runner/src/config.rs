//! Daemon configuration: `shortlab.toml` plus environment overrides.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration for dry runs. Telegram credentials are normally supplied via
//! `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`, which win over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shortlab_core::domain::Timeframe;
use shortlab_core::signals::evaluator::DEFAULT_SCORE_THRESHOLD;
use shortlab_core::signals::{EvaluatorConfig, GrowthGate, ReversalConfig};

pub const DEFAULT_CONFIG_FILE: &str = "shortlab.toml";
pub const CONFIG_PATH_ENV: &str = "SHORTLAB_CONFIG";
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ENV: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("missing {what}: set {env} or [telegram] in the config file")]
    MissingSecret {
        what: &'static str,
        env: &'static str,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

/// Reversal scanner settings (`[scanner]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Fixed symbol list; empty means "every USDT symbol below the turnover cap".
    pub symbols: Vec<String>,
    pub max_turnover_24h: f64,
    pub timeframes: Vec<Timeframe>,
    pub confirm_timeframe: Timeframe,
    pub candle_limit: usize,
    pub symbol_delay_ms: u64,
    pub interval_secs: u64,
    pub scoring: ReversalConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            max_turnover_24h: 300_000.0,
            timeframes: vec![
                Timeframe::ONE_MINUTE,
                Timeframe::THREE_MINUTES,
                Timeframe::FIVE_MINUTES,
            ],
            confirm_timeframe: Timeframe::FIFTEEN_MINUTES,
            candle_limit: 200,
            symbol_delay_ms: 1_000,
            interval_secs: 10,
            scoring: ReversalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    /// Higher timeframe used for the support-break factor; `0` in the file
    /// disables it.
    #[serde(with = "zero_disables")]
    pub support_timeframe: Option<Timeframe>,
    pub candle_limit: usize,
    pub book_depth: usize,
    pub score_threshold: u8,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    /// Notify HOLD decisions too (they are always recorded).
    pub notify_holds: bool,
    pub max_cycles: Option<u64>,
    pub log_path: PathBuf,
    pub base_url: String,
    pub growth_gate: GrowthGate,
    pub telegram: TelegramConfig,
    pub scanner: ScannerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            timeframes: vec![
                Timeframe::ONE_MINUTE,
                Timeframe::FIVE_MINUTES,
                Timeframe::FIFTEEN_MINUTES,
            ],
            support_timeframe: Some(Timeframe::FIVE_MINUTES),
            candle_limit: 200,
            book_depth: shortlab_core::data::DEFAULT_BOOK_DEPTH,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            poll_interval_secs: 10,
            request_timeout_secs: 10,
            notify_holds: false,
            max_cycles: None,
            log_path: PathBuf::from("signals_log.csv"),
            base_url: shortlab_core::data::DEFAULT_BASE_URL.to_string(),
            growth_gate: GrowthGate::default(),
            telegram: TelegramConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve and load the configuration, then apply environment overrides.
    ///
    /// Order: `explicit`, else `$SHORTLAB_CONFIG`, else `./shortlab.toml` when
    /// it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match resolve_path(explicit, from_env) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override secrets from a key lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(TELEGRAM_TOKEN_ENV) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat) = non_empty(TELEGRAM_CHAT_ENV) {
            self.telegram.chat_id = Some(chat);
        }
    }

    /// Startup validation. Telegram credentials are only required when
    /// messages will actually be sent.
    pub fn validate(&self, dry_run: bool) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        if self.timeframes.is_empty() {
            return Err(ConfigError::Invalid("timeframes must not be empty".into()));
        }
        let all_timeframes = self
            .timeframes
            .iter()
            .chain(self.support_timeframe.iter())
            .chain(self.scanner.timeframes.iter())
            .chain(std::iter::once(&self.scanner.confirm_timeframe));
        for tf in all_timeframes {
            if tf.as_minutes() == 0 {
                return Err(ConfigError::Invalid("timeframe must be at least 1 minute".into()));
            }
        }
        if self.score_threshold == 0 {
            return Err(ConfigError::Invalid("score_threshold must be at least 1".into()));
        }
        if self.candle_limit < 20 {
            return Err(ConfigError::Invalid(format!(
                "candle_limit {} is below the 20 candles the evaluator needs",
                self.candle_limit
            )));
        }
        if self.book_depth == 0 {
            return Err(ConfigError::Invalid("book_depth must be at least 1".into()));
        }
        if self.poll_interval_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs and request_timeout_secs must be positive".into(),
            ));
        }
        let threshold = self.growth_gate.min_growth_pct;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "growth_gate.min_growth_pct must be a non-negative number, got {threshold}"
            )));
        }
        if self.scanner.timeframes.is_empty() {
            return Err(ConfigError::Invalid("scanner.timeframes must not be empty".into()));
        }

        if !dry_run {
            if self.telegram.bot_token.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingSecret {
                    what: "Telegram bot token",
                    env: TELEGRAM_TOKEN_ENV,
                });
            }
            if self.telegram.chat_id.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingSecret {
                    what: "Telegram chat id",
                    env: TELEGRAM_CHAT_ENV,
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            score_threshold: self.score_threshold,
        }
    }
}

/// TOML has no null, so an optional timeframe is spelled `0` when off.
mod zero_disables {
    use serde::{Deserialize, Deserializer, Serializer};
    use shortlab_core::domain::Timeframe;

    pub fn serialize<S: Serializer>(tf: &Option<Timeframe>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(tf.map_or(0, |tf| tf.as_minutes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timeframe>, D::Error> {
        let minutes = u32::deserialize(d)?;
        Ok((minutes > 0).then(|| Timeframe::minutes(minutes)))
    }
}

fn resolve_path(explicit: Option<&Path>, from_env: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

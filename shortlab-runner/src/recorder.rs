//! Durable signal log: an append-only CSV file.
//!
//! Rows are never rewritten. The header is written only when the file is
//! created (or found empty), and the file is reopened in append mode for every
//! row. [`RecorderHandle`] funnels all writes through one owner task so rows
//! from concurrent pairs never interleave.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use shortlab_core::domain::{RiskLevel, Signal, SignalDecision};
use shortlab_core::signals::ReversalAlert;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const REASON_SEPARATOR: &str = "; ";
const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("signal log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("signal log CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("recorder task has shut down")]
    Closed,
}

/// One row of the signal log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: String,
    pub symbol: String,
    /// `5m` for decisions, the joined hit list (`1m,3m`) for reversal alerts.
    pub timeframe: String,
    pub price: f64,
    pub signal: Signal,
    pub strength: u32,
    pub risk_level: Option<RiskLevel>,
    pub funding: Option<f64>,
    pub oi_change: Option<f64>,
    pub reasons: String,
}

impl SignalRecord {
    pub fn from_decision(
        timestamp: DateTime<Utc>,
        symbol: &str,
        price: f64,
        decision: &SignalDecision,
    ) -> Self {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            symbol: symbol.to_string(),
            timeframe: decision.timeframe.to_string(),
            price,
            signal: decision.signal,
            strength: u32::from(decision.strength),
            risk_level: decision.risk_level,
            funding: decision.funding,
            oi_change: decision.oi_change,
            reasons: decision.joined_reasons(),
        }
    }

    /// Reversal alerts are logged as SHORT rows with strength = probability.
    pub fn from_alert(timestamp: DateTime<Utc>, alert: &ReversalAlert) -> Self {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            symbol: alert.symbol.clone(),
            timeframe: alert.joined_hits(),
            price: alert.price,
            signal: Signal::Short,
            strength: alert.probability,
            risk_level: None,
            funding: None,
            oi_change: None,
            reasons: alert.reasons.join(REASON_SEPARATOR),
        }
    }

    pub fn reasons_list(&self) -> Vec<String> {
        if self.reasons.is_empty() {
            return Vec::new();
        }
        self.reasons
            .split(REASON_SEPARATOR)
            .map(str::to_string)
            .collect()
    }
}

/// Synchronous CSV appender.
#[derive(Debug, Clone)]
pub struct Recorder {
    path: PathBuf,
}

impl Recorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &SignalRecord) -> Result<(), RecordError> {
        let io_err = |source| RecordError::Io {
            path: self.path.clone(),
            source,
        };
        let csv_err = |source| RecordError::Csv {
            path: self.path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let needs_header = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record).map_err(csv_err)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }
}

/// Read every row of the log. A missing file is an empty log.
pub fn read_records(path: &Path) -> Result<Vec<SignalRecord>, RecordError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let csv_err = |source| RecordError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<SignalRecord>, _>>()
        .map_err(csv_err)
}

type Job = (SignalRecord, oneshot::Sender<Result<(), RecordError>>);

/// Cloneable handle to the single recorder owner task.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<Job>,
}

impl RecorderHandle {
    /// Start the owner task. It exits once every handle has been dropped.
    pub fn spawn(recorder: Recorder) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_CAPACITY);
        let task = tokio::task::spawn_blocking(move || {
            while let Some((record, ack)) = rx.blocking_recv() {
                let result = recorder.append(&record);
                if result.is_ok() {
                    debug!(symbol = %record.symbol, signal = %record.signal, "recorded signal");
                }
                // the caller may have stopped waiting
                let _ = ack.send(result);
            }
        });
        (Self { tx }, task)
    }

    pub async fn record(&self, record: SignalRecord) -> Result<(), RecordError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send((record, ack_tx))
            .await
            .map_err(|_| RecordError::Closed)?;
        ack_rx.await.map_err(|_| RecordError::Closed)?
    }

    pub async fn append(
        &self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        price: f64,
        decision: &SignalDecision,
    ) -> Result<(), RecordError> {
        self.record(SignalRecord::from_decision(timestamp, symbol, price, decision))
            .await
    }
}

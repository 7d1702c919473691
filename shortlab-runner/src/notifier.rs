//! Operator notifications.
//!
//! Delivery is best effort: a failed send is returned as [`DeliveryError`],
//! logged by the caller, and never retried or allowed to block the recorder.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use shortlab_core::domain::SignalDecision;
use shortlab_core::signals::ReversalAlert;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notifier HTTP client error: {0}")]
    Client(String),

    #[error("delivery request failed: {0}")]
    Request(String),

    #[error("Telegram rejected the message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Outbound channel for signals.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, decision: &SignalDecision, price: f64) -> Result<(), DeliveryError>;

    async fn notify_reversal(&self, alert: &ReversalAlert) -> Result<(), DeliveryError>;
}

/// Markdown message for one decision.
///
/// Funding arrives as a raw fraction and is shown in percent.
pub fn format_decision(decision: &SignalDecision, price: f64) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "📉 *Futures signal {} ({})*",
        decision.symbol, decision.timeframe
    );
    let _ = writeln!(text, "Price: `{price}`");
    let _ = writeln!(text, "Signal: *{}*", decision.signal);
    let _ = writeln!(text, "Strength: {}%", decision.strength);
    match decision.risk_level {
        Some(risk) => {
            let _ = writeln!(text, "Risk: *{risk}*");
        }
        None => {
            let _ = writeln!(text, "Risk: *N/A*");
        }
    }
    if let Some(funding) = decision.funding {
        let _ = writeln!(text, "Funding: `{:+.4}%`", funding * 100.0);
    }
    if let Some(oi) = decision.oi_change {
        let _ = writeln!(text, "OI change: `{oi:+.2}%`");
    }
    if !decision.reasons.is_empty() {
        text.push_str("\n*Factors:*\n");
        for reason in &decision.reasons {
            let _ = writeln!(text, "- {reason}");
        }
    }
    text.trim_end().to_string()
}

pub fn format_reversal(alert: &ReversalAlert) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "🚨 *REVERSAL SHORT SIGNAL*\n");
    let _ = writeln!(text, "*{}*", alert.symbol);
    let _ = writeln!(text, "Price: `{}`", alert.price);
    let _ = writeln!(text, "Probability: {}%", alert.probability);
    let _ = writeln!(text, "Score: {}", alert.score);
    text.push_str("\n*Indicators triggered:*\n");
    for reason in &alert.reasons {
        let _ = writeln!(text, "• {reason}");
    }
    let hits: Vec<String> = alert.timeframe_hits.iter().map(|tf| tf.to_string()).collect();
    let _ = write!(text, "\n*TF confirmation:* {}", hits.join(", "));
    text
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API `sendMessage` notifier.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };
        let resp = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token
            .map_err(|e| DeliveryError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        let reply: Option<TelegramReply> = resp.json().await.ok();
        match reply {
            Some(r) if status.is_success() && r.ok => Ok(()),
            other => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, decision: &SignalDecision, price: f64) -> Result<(), DeliveryError> {
        self.send(&format_decision(decision, price)).await
    }

    async fn notify_reversal(&self, alert: &ReversalAlert) -> Result<(), DeliveryError> {
        self.send(&format_reversal(alert)).await
    }
}

/// Dry-run notifier: writes the rendered message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, decision: &SignalDecision, price: f64) -> Result<(), DeliveryError> {
        info!(
            symbol = %decision.symbol,
            timeframe = %decision.timeframe,
            signal = %decision.signal,
            "notification (dry run)\n{}",
            format_decision(decision, price)
        );
        Ok(())
    }

    async fn notify_reversal(&self, alert: &ReversalAlert) -> Result<(), DeliveryError> {
        info!(
            symbol = %alert.symbol,
            probability = alert.probability,
            "reversal notification (dry run)\n{}",
            format_reversal(alert)
        );
        Ok(())
    }
}

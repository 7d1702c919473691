//! Bybit v5 public market data provider (linear perpetuals).
//!
//! Every endpoint answers with the envelope `{retCode, retMsg, result}`; a
//! non-zero `retCode` is an exchange-side error even on HTTP 200. Numbers
//! arrive as strings. Kline rows arrive newest first and are reversed into
//! ascending order by [`CandleSeries::new`].
//!
//! No retries: a failed fetch means the pair is skipped this cycle.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{DataError, MarketDataProvider};
use crate::domain::{Candle, CandleSeries, FundingAndOI, OrderBookAggregate, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exchange cap on candles per kline request.
pub const MAX_KLINE_LIMIT: usize = 1000;
/// Exchange cap on order book levels per side.
const MAX_BOOK_LIMIT: usize = 500;
/// Paging stops after this many kline requests.
const MAX_KLINE_PAGES: usize = 10;
const CATEGORY: &str = "linear";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    list: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OrderbookResult {
    b: Vec<(String, String)>,
    a: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TickersResult {
    list: Vec<TickerRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerRow {
    symbol: String,
    #[serde(default)]
    funding_rate: Option<String>,
    #[serde(default, rename = "turnover24h")]
    turnover_24h: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenInterestResult {
    list: Vec<OpenInterestRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenInterestRow {
    open_interest: String,
}

/// Unwrap the envelope and decode `result`.
pub(crate) fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, DataError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("invalid envelope: {e}")))?;
    if envelope.ret_code != 0 {
        return Err(DataError::Api {
            code: envelope.ret_code,
            message: envelope.ret_msg,
        });
    }
    serde_json::from_value(envelope.result)
        .map_err(|e| DataError::ResponseFormatChanged(format!("invalid result: {e}")))
}

fn parse_number(field: &str, raw: &str) -> Result<f64, DataError> {
    raw.parse::<f64>()
        .map_err(|_| DataError::ResponseFormatChanged(format!("{field} is not a number: {raw:?}")))
}

/// Optional numeric field: empty or unparsable strings count as absent.
fn parse_optional(raw: Option<&str>) -> Option<f64> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Kline rows `[start, open, high, low, close, volume, turnover]`, any order.
pub(crate) fn parse_klines(body: &str) -> Result<Vec<Candle>, DataError> {
    let result: KlineResult = parse_envelope(body)?;
    result
        .list
        .iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(DataError::ResponseFormatChanged(format!(
                    "kline row has {} fields, expected at least 6",
                    row.len()
                )));
            }
            let timestamp = row[0].parse::<i64>().map_err(|_| {
                DataError::ResponseFormatChanged(format!("invalid kline start: {:?}", row[0]))
            })?;
            Ok(Candle {
                timestamp,
                open: parse_number("open", &row[1])?,
                high: parse_number("high", &row[2])?,
                low: parse_number("low", &row[3])?,
                close: parse_number("close", &row[4])?,
                volume: parse_number("volume", &row[5])?,
            })
        })
        .collect()
}

pub(crate) fn parse_orderbook(body: &str, depth: usize) -> Result<OrderBookAggregate, DataError> {
    let result: OrderbookResult = parse_envelope(body)?;
    let levels = |side: &[(String, String)]| -> Result<Vec<(f64, f64)>, DataError> {
        side.iter()
            .map(|(p, q)| Ok((parse_number("price", p)?, parse_number("size", q)?)))
            .collect()
    };
    Ok(OrderBookAggregate::from_levels(
        &levels(&result.b)?,
        &levels(&result.a)?,
        depth,
    ))
}

/// Funding rate as a raw fraction (0.0001 = 0.01%).
pub(crate) fn parse_funding_rate(body: &str, symbol: &str) -> Result<Option<f64>, DataError> {
    let result: TickersResult = parse_envelope(body)?;
    Ok(result
        .list
        .iter()
        .find(|row| row.symbol == symbol)
        .and_then(|row| parse_optional(row.funding_rate.as_deref())))
}

/// Percent change between the two most recent open-interest samples.
pub(crate) fn parse_open_interest_change(body: &str) -> Result<Option<f64>, DataError> {
    let result: OpenInterestResult = parse_envelope(body)?;
    let mut samples = result
        .list
        .iter()
        .map(|row| parse_optional(Some(row.open_interest.as_str())));
    // newest first
    let (Some(Some(latest)), Some(Some(previous))) = (samples.next(), samples.next()) else {
        return Ok(None);
    };
    if previous <= 0.0 {
        return Ok(None);
    }
    Ok(Some((latest - previous) / previous * 100.0))
}

pub(crate) fn parse_low_turnover_symbols(
    body: &str,
    max_turnover: f64,
) -> Result<Vec<String>, DataError> {
    let result: TickersResult = parse_envelope(body)?;
    let mut symbols: Vec<String> = result
        .list
        .into_iter()
        .filter(|row| row.symbol.ends_with("USDT"))
        .filter(|row| {
            parse_optional(row.turnover_24h.as_deref()).is_some_and(|t| t < max_turnover)
        })
        .map(|row| row.symbol)
        .collect();
    symbols.sort();
    Ok(symbols)
}

/// Bybit public REST provider.
pub struct BybitProvider {
    client: reqwest::Client,
    base_url: String,
}

impl BybitProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shortlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// GET a public endpoint and return the body text.
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, DataError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited { url });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }
        resp.text()
            .await
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        end_ms: Option<i64>,
    ) -> Result<Vec<Candle>, DataError> {
        let mut query = vec![
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
            ("interval", timeframe.interval()),
            ("limit", limit.clamp(1, MAX_KLINE_LIMIT).to_string()),
        ];
        if let Some(end) = end_ms {
            query.push(("end", end.to_string()));
        }
        let body = self.get_text("/v5/market/kline", &query).await?;
        parse_klines(&body)
    }

    async fn fetch_funding(&self, symbol: &str) -> Result<Option<f64>, DataError> {
        let query = [
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
        ];
        let body = self.get_text("/v5/market/tickers", &query).await?;
        parse_funding_rate(&body, symbol)
    }

    async fn fetch_oi_change(&self, symbol: &str) -> Result<Option<f64>, DataError> {
        let query = [
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
            ("intervalTime", "5min".to_string()),
            ("limit", "2".to_string()),
        ];
        let body = self.get_text("/v5/market/open-interest", &query).await?;
        parse_open_interest_change(&body)
    }
}

#[async_trait]
impl MarketDataProvider for BybitProvider {
    fn name(&self) -> &str {
        "bybit"
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, DataError> {
        let candles = self.fetch_klines(symbol, timeframe, limit, None).await?;
        Ok(CandleSeries::new(symbol, timeframe, candles)?)
    }

    async fn get_candles_since(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
    ) -> Result<CandleSeries, DataError> {
        let mut collected: Vec<Candle> = Vec::new();
        let mut end_ms: Option<i64> = None;

        for page in 0..MAX_KLINE_PAGES {
            let batch = self
                .fetch_klines(symbol, timeframe, MAX_KLINE_LIMIT, end_ms)
                .await?;
            let Some(oldest) = batch.iter().map(|c| c.timestamp).min() else {
                break;
            };
            let full_page = batch.len() >= MAX_KLINE_LIMIT;
            collected.extend(batch.into_iter().filter(|c| c.timestamp >= since_ms));
            debug!(symbol, %timeframe, page, oldest, "kline page");
            if oldest <= since_ms || !full_page {
                break;
            }
            end_ms = Some(oldest - 1);
        }

        Ok(CandleSeries::new(symbol, timeframe, collected)?)
    }

    async fn get_orderbook_aggregate(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookAggregate, DataError> {
        let query = [
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
            ("limit", depth.clamp(1, MAX_BOOK_LIMIT).to_string()),
        ];
        let body = self.get_text("/v5/market/orderbook", &query).await?;
        parse_orderbook(&body, depth)
    }

    async fn get_funding_and_oi(&self, symbol: &str) -> FundingAndOI {
        let (funding, oi) = tokio::join!(self.fetch_funding(symbol), self.fetch_oi_change(symbol));
        let funding_rate = funding.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "funding rate unavailable");
            None
        });
        let open_interest_change_pct = oi.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "open interest unavailable");
            None
        });
        FundingAndOI {
            funding_rate,
            open_interest_change_pct,
        }
    }

    async fn list_symbols_below_turnover(
        &self,
        max_turnover: f64,
    ) -> Result<Vec<String>, DataError> {
        let query = [("category", CATEGORY.to_string())];
        let body = self.get_text("/v5/market/tickers", &query).await?;
        parse_low_turnover_symbols(&body, max_turnover)
    }
}

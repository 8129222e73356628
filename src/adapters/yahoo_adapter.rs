//! Yahoo Finance chart API data adapter.
//!
//! Uses the public v8 chart endpoint with daily interval. Responses carry
//! parallel arrays of timestamps and quotes; missing quotes come back as
//! `null` and are dropped.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::error::{DipbuyerError, FetchError};
use crate::domain::price::{normalize_series, DailyBar};
use crate::domain::universe::check_symbol;
use crate::ports::data_port::PriceDataPort;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("dipbuyer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DipbuyerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DipbuyerError::invalid("data", "base_url", e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }
}

impl PriceDataPort for YahooAdapter {
    fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, FetchError> {
        check_symbol(symbol).map_err(|e| FetchError::Provider {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;
        let period1 = day_start_timestamp(start_date);
        // period2 is exclusive
        let period2 = day_start_timestamp(end_date.succ_opt().unwrap_or(end_date));
        let url = self.chart_url(symbol);
        debug!("Fetching daily chart from: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .map_err(|e| classify_request_error(symbol, e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| classify_request_error(symbol, e))?;

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(FetchError::Transient {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", status),
            });
        }
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(FetchError::Provider {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let bars = parse_chart(symbol, &body)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect::<Vec<_>>();
        info!("Fetched {} daily bars for {}", bars.len(), symbol);
        Ok(bars)
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn classify_request_error(symbol: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        FetchError::Transient {
            symbol: symbol.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Provider {
            symbol: symbol.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Converts a chart payload into normalized bars. Dates are taken in the
/// exchange's local time using the `gmtoffset` from the response metadata.
fn parse_chart(symbol: &str, body: &str) -> Result<Vec<DailyBar>, FetchError> {
    let response: ChartResponse = serde_json::from_str(body).map_err(|e| FetchError::Provider {
        symbol: symbol.to_string(),
        reason: format!("invalid chart payload: {}", e),
    })?;

    if let Some(err) = response.chart.error {
        return Err(if err.code.eq_ignore_ascii_case("Not Found") {
            FetchError::NotFound {
                symbol: symbol.to_string(),
            }
        } else {
            FetchError::Provider {
                symbol: symbol.to_string(),
                reason: match err.description {
                    Some(desc) => format!("{}: {}", err.code, desc),
                    None => err.code,
                },
            }
        });
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(close) = at(&quote.close, i) else {
            continue;
        };
        let Some(date) = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .map(|dt| dt.date_naive())
        else {
            continue;
        };
        bars.push(DailyBar {
            date,
            open: at(&quote.open, i).unwrap_or(close),
            high: at(&quote.high, i).unwrap_or(close),
            low: at(&quote.low, i).unwrap_or(close),
            close,
            volume: at(&quote.volume, i).unwrap_or(0.0) as i64,
        });
    }

    Ok(normalize_series(bars))
}

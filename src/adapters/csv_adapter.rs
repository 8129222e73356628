//! CSV directory data adapter.
//!
//! Each symbol lives in `{base_path}/{SYMBOL}.csv` with a header row. `date`
//! and `close` columns are required; `open`, `high`, `low` and `volume` are
//! picked up when present. Column names are matched case-insensitively.

use crate::domain::error::FetchError;
use crate::domain::price::{normalize_series, DailyBar};
use crate::domain::universe::check_symbol;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(symbol: &str, headers: &csv::StringRecord) -> Result<Self, FetchError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| provider(symbol, format!("missing {name} column")))
        };
        Ok(Self {
            date: require("date")?,
            close: require("close")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            volume: find("volume"),
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, FetchError> {
        check_symbol(symbol).map_err(|e| provider(symbol, e.to_string()))?;
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound {
                symbol: symbol.to_string(),
            },
            _ => provider(symbol, format!("failed to read {}: {}", path.display(), e)),
        })?;
        debug!(symbol, path = %path.display(), "reading price csv");

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| provider(symbol, format!("CSV header error: {}", e)))?
            .clone();
        let cols = Columns::from_headers(symbol, &headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| provider(symbol, format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(cols.date)
                .ok_or_else(|| provider(symbol, "missing date value".into()))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| provider(symbol, format!("invalid date {:?}: {}", date_str, e)))?;

            if date < start_date || date > end_date {
                continue;
            }

            let close = parse_price(symbol, &record, Some(cols.close), "close")?
                .ok_or_else(|| provider(symbol, "missing close value".into()))?;

            let mut bar = DailyBar::from_close(date, close);
            if let Some(open) = parse_price(symbol, &record, cols.open, "open")? {
                bar.open = open;
            }
            if let Some(high) = parse_price(symbol, &record, cols.high, "high")? {
                bar.high = high;
            }
            if let Some(low) = parse_price(symbol, &record, cols.low, "low")? {
                bar.low = low;
            }
            if let Some(idx) = cols.volume {
                let raw = record.get(idx).unwrap_or("").trim();
                if !raw.is_empty() {
                    // exports sometimes write volume as a float
                    bar.volume = raw
                        .parse::<f64>()
                        .map_err(|e| provider(symbol, format!("invalid volume value: {}", e)))?
                        as i64;
                }
            }
            bars.push(bar);
        }

        Ok(normalize_series(bars))
    }
}

fn parse_price(
    symbol: &str,
    record: &csv::StringRecord,
    idx: Option<usize>,
    name: &str,
) -> Result<Option<f64>, FetchError> {
    let Some(raw) = idx.and_then(|i| record.get(i)).map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e| provider(symbol, format!("invalid {} value: {}", name, e)))
}

fn provider(symbol: &str, reason: String) -> FetchError {
    FetchError::Provider {
        symbol: symbol.to_string(),
        reason,
    }
}

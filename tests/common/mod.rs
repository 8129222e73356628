#![allow(dead_code)]

use chrono::NaiveDate;
use dipbuyer::domain::backtest::BacktestParams;
use dipbuyer::domain::error::FetchError;
pub use dipbuyer::domain::price::DailyBar;
use dipbuyer::domain::strategy::Thresholds;
use dipbuyer::ports::data_port::PriceDataPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<DailyBar>>,
    pub errors: HashMap<String, FetchError>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.data
            .insert(symbol.to_string(), make_bars("2024-01-01", closes));
        self
    }

    pub fn with_error(mut self, symbol: &str, error: FetchError) -> Self {
        self.errors.insert(symbol.to_string(), error);
        self
    }
}

impl PriceDataPort for MockDataPort {
    fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, FetchError> {
        if let Some(err) = self.errors.get(symbol) {
            return Err(err.clone());
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .cloned()
                .collect()),
            None => Err(FetchError::NotFound {
                symbol: symbol.to_string(),
            }),
        }
    }
}

/// Records which symbols were requested, in order.
pub struct CountingPort<P> {
    pub inner: P,
    pub calls: RefCell<Vec<String>>,
}

impl<P: PriceDataPort> CountingPort<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl<P: PriceDataPort> PriceDataPort for CountingPort<P> {
    fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, FetchError> {
        self.calls.borrow_mut().push(symbol.to_string());
        self.inner.fetch_daily(symbol, start_date, end_date)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bars(start_date: &str, closes: &[f64]) -> Vec<DailyBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| DailyBar::from_close(start + chrono::Duration::days(i as i64), c))
        .collect()
}

pub fn default_params() -> BacktestParams {
    BacktestParams {
        thresholds: Thresholds::default(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
    }
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

//! Backtest pass over a daily price series.
//!
//! [`simulate`] is a pure fold over the bars carrying a [`Position`]; it emits
//! one [`TradeRecord`] per bar. [`backtest`] wraps it with data retrieval and
//! turns every retrieval problem into a typed [`BacktestOutcome::Skipped`].

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::error::FetchError;
use crate::domain::position::{Position, Signal};
use crate::domain::price::DailyBar;
use crate::domain::strategy::Thresholds;
use crate::ports::data_port::PriceDataPort;

/// Bars needed before any day-over-day comparison is possible.
pub const MIN_BARS: usize = 2;

#[derive(Debug, Clone)]
pub struct BacktestParams {
    pub thresholds: Thresholds,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeStatus {
    #[default]
    None,
    Bought,
    Sold,
}

impl TradeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TradeStatus::None => "",
            TradeStatus::Bought => "Bought",
            TradeStatus::Sold => "Sold",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub bar: DailyBar,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub status: TradeStatus,
    pub target_achieved: bool,
}

impl TradeRecord {
    fn new(bar: &DailyBar, signal: Option<Signal>) -> Self {
        let mut record = Self {
            bar: bar.clone(),
            buy_price: None,
            sell_price: None,
            status: TradeStatus::None,
            target_achieved: false,
        };
        match signal {
            Some(Signal::Buy { price }) => {
                record.buy_price = Some(price);
                record.status = TradeStatus::Bought;
            }
            Some(Signal::Sell { price }) => {
                record.sell_price = Some(price);
                record.status = TradeStatus::Sold;
                record.target_achieved = true;
            }
            None => {}
        }
        record
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub symbol: String,
    /// Completed round trips (sells).
    pub total_trades: usize,
    /// Positions opened (buys), including one still held at the end.
    pub open_positions: usize,
    pub successful_trades: usize,
}

impl SummaryRecord {
    pub fn from_trades(symbol: &str, trades: &[TradeRecord]) -> Self {
        let count = |status| trades.iter().filter(|t| t.status == status).count();
        Self {
            symbol: symbol.to_string(),
            total_trades: count(TradeStatus::Sold),
            open_positions: count(TradeStatus::Bought),
            successful_trades: trades.iter().filter(|t| t.target_achieved).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub trades: Vec<TradeRecord>,
    pub summary: SummaryRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientData { bars: usize },
    NotFound,
    Transient { reason: String },
    Provider { reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data in range"),
            SkipReason::InsufficientData { bars } => {
                write!(f, "only {bars} bar(s), need at least {MIN_BARS}")
            }
            SkipReason::NotFound => write!(f, "symbol not found"),
            SkipReason::Transient { reason } => write!(f, "temporary failure: {reason}"),
            SkipReason::Provider { reason } => write!(f, "provider error: {reason}"),
        }
    }
}

impl From<FetchError> for SkipReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { .. } => SkipReason::NotFound,
            FetchError::Transient { reason, .. } => SkipReason::Transient { reason },
            FetchError::Provider { reason, .. } => SkipReason::Provider { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BacktestOutcome {
    Traded(BacktestResult),
    Skipped { symbol: String, reason: SkipReason },
}

impl BacktestOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            BacktestOutcome::Traded(r) => &r.symbol,
            BacktestOutcome::Skipped { symbol, .. } => symbol,
        }
    }

    pub fn result(&self) -> Option<&BacktestResult> {
        match self {
            BacktestOutcome::Traded(r) => Some(r),
            BacktestOutcome::Skipped { .. } => None,
        }
    }
}

/// Labels every bar. The first bar has no prior close and never trades.
pub fn simulate(bars: &[DailyBar], thresholds: &Thresholds) -> Vec<TradeRecord> {
    let (records, _, _) = bars.iter().fold(
        (Vec::with_capacity(bars.len()), None::<f64>, Position::Flat),
        |(mut records, prev_close, position), bar| {
            let (next, signal) = match prev_close {
                Some(prev) => position.step(prev, bar.close, thresholds),
                None => (position, None),
            };
            records.push(TradeRecord::new(bar, signal));
            (records, Some(bar.close), next)
        },
    );
    records
}

/// Runs the rule on an already retrieved series.
pub fn run_series(symbol: &str, bars: &[DailyBar], thresholds: &Thresholds) -> BacktestOutcome {
    if bars.is_empty() {
        return skipped(symbol, SkipReason::NoData);
    }
    if bars.len() < MIN_BARS {
        return skipped(symbol, SkipReason::InsufficientData { bars: bars.len() });
    }

    let trades = simulate(bars, thresholds);
    let summary = SummaryRecord::from_trades(symbol, &trades);
    debug!(
        symbol,
        bars = bars.len(),
        sells = summary.total_trades,
        buys = summary.open_positions,
        "backtest pass complete"
    );
    BacktestOutcome::Traded(BacktestResult {
        symbol: symbol.to_string(),
        trades,
        summary,
    })
}

/// Fetches the series for one symbol and backtests it. Never fails: retrieval
/// problems are logged and reported as [`BacktestOutcome::Skipped`].
pub fn backtest(
    data_port: &dyn PriceDataPort,
    symbol: &str,
    params: &BacktestParams,
) -> BacktestOutcome {
    let bars = match data_port.fetch_daily(symbol, params.start_date, params.end_date) {
        Ok(bars) => bars,
        Err(e) => {
            warn!(symbol, retryable = e.is_retryable(), "skipping: {e}");
            return BacktestOutcome::Skipped {
                symbol: symbol.to_string(),
                reason: e.into(),
            };
        }
    };

    let outcome = run_series(symbol, &bars, &params.thresholds);
    if let BacktestOutcome::Skipped { reason, .. } = &outcome {
        warn!(symbol, "skipping: {reason}");
    }
    outcome
}

/// Backtests each symbol in order, one after another.
pub fn run_batch(
    data_port: &dyn PriceDataPort,
    symbols: &[String],
    params: &BacktestParams,
) -> Vec<BacktestOutcome> {
    info!(
        symbols = symbols.len(),
        start = %params.start_date,
        end = %params.end_date,
        buy_drop_pct = params.thresholds.buy_drop_pct(),
        sell_profit_pct = params.thresholds.sell_profit_pct(),
        "running backtest batch"
    );
    symbols
        .iter()
        .map(|symbol| backtest(data_port, symbol, params))
        .collect()
}

fn skipped(symbol: &str, reason: SkipReason) -> BacktestOutcome {
    BacktestOutcome::Skipped {
        symbol: symbol.to_string(),
        reason,
    }
}

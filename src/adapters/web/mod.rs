//! Web dashboard adapter.
//!
//! Axum server with a single form page. Submitting the form runs the same
//! backtest-then-report pipeline as the CLI and renders the summary table;
//! the generated workbook can then be downloaded.

mod error;
mod handlers;
mod templates;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cli::DEFAULT_START_DATE;
use crate::domain::strategy::{DEFAULT_BUY_DROP_PCT, DEFAULT_SELL_PROFIT_PCT};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

pub struct AppState {
    pub data_port: Arc<dyn PriceDataPort + Send + Sync>,
    pub report_port: Arc<dyn ReportPort + Send + Sync>,
    pub output_path: PathBuf,
    pub defaults: FormDefaults,
    /// Path of the workbook written by the last run, if that run produced
    /// one. Held while a run writes the file and while a download reads it.
    last_report: Mutex<Option<PathBuf>>,
}

impl AppState {
    pub fn new(
        data_port: Arc<dyn PriceDataPort + Send + Sync>,
        report_port: Arc<dyn ReportPort + Send + Sync>,
        output_path: PathBuf,
        defaults: FormDefaults,
    ) -> Self {
        Self {
            data_port,
            report_port,
            output_path,
            defaults,
            last_report: Mutex::new(None),
        }
    }
}

/// Values the dashboard form starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefaults {
    pub symbols: String,
    pub buy_drop_pct: f64,
    pub sell_profit_pct: f64,
    pub start_date: String,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            symbols: String::new(),
            buy_drop_pct: DEFAULT_BUY_DROP_PCT,
            sell_profit_pct: DEFAULT_SELL_PROFIT_PCT,
            start_date: DEFAULT_START_DATE.to_string(),
        }
    }
}

impl FormDefaults {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let base = Self::default();
        Self {
            symbols: config.get_string("backtest", "symbols").unwrap_or(base.symbols),
            buy_drop_pct: config.get_double("backtest", "buy_drop_pct", base.buy_drop_pct),
            sell_profit_pct: config.get_double("backtest", "sell_profit_pct", base.sell_profit_pct),
            start_date: config
                .get_string("backtest", "start_date")
                .unwrap_or(base.start_date),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/backtest", post(handlers::run_backtest))
        .route("/report", get(handlers::download_report))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}

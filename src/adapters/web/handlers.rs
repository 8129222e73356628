//! HTTP request handlers for web adapter.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
};
use chrono::Local;
use std::sync::Arc;
use tracing::info;

use crate::domain::backtest::BacktestParams;
use crate::domain::batch::backtest_and_report;
use crate::domain::config_validation::parse_date;
use crate::domain::report::ReportOutcome;
use crate::domain::strategy::Thresholds;
use crate::domain::universe::parse_symbols;

use super::templates::{DashboardTemplate, ResultsTemplate};
use super::{AppState, WebError};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn render(template: &impl Template) -> Result<Response, WebError> {
    let html = template
        .render()
        .map_err(|e| WebError::internal(e.to_string()))?;
    Ok(Html(html).into_response())
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    render(&DashboardTemplate::new(&state.defaults))
}

#[derive(Debug, serde::Deserialize)]
pub struct BacktestFormData {
    pub symbols: String,
    pub buy_drop_pct: String,
    pub sell_profit_pct: String,
    pub start_date: String,
}

pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BacktestFormData>,
) -> Result<Response, WebError> {
    let symbols = parse_symbols(&form.symbols).map_err(|e| WebError::bad_request(e.to_string()))?;
    let buy_drop: f64 = form
        .buy_drop_pct
        .trim()
        .parse()
        .map_err(|_| WebError::bad_request("Invalid buy drop percentage"))?;
    let sell_profit: f64 = form
        .sell_profit_pct
        .trim()
        .parse()
        .map_err(|_| WebError::bad_request("Invalid sell profit percentage"))?;
    let thresholds = Thresholds::new(buy_drop, sell_profit)?;
    let start_date = parse_date("backtest", "start_date", &form.start_date)?;
    let end_date = Local::now().date_naive();
    if start_date > end_date {
        return Err(WebError::bad_request("Start date is in the future"));
    }

    let params = BacktestParams {
        thresholds,
        start_date,
        end_date,
    };
    info!(symbols = symbols.len(), "dashboard backtest requested");

    // one run at a time owns the output file
    let mut last_report = state.last_report.lock().await;
    *last_report = None;

    let worker = Arc::clone(&state);
    let batch = tokio::task::spawn_blocking(move || {
        backtest_and_report(
            worker.data_port.as_ref(),
            worker.report_port.as_ref(),
            &symbols,
            &params,
            &worker.output_path,
        )
    })
    .await
    .map_err(|e| WebError::internal(format!("backtest task failed: {e}")))??;

    if let ReportOutcome::Generated { path, .. } = &batch.report {
        *last_report = Some(path.clone());
    }
    drop(last_report);

    render(&ResultsTemplate::new(&batch))
}

pub async fn download_report(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let last_report = state.last_report.lock().await;
    let Some(path) = last_report.as_ref() else {
        return Err(WebError::not_found("No report from the last run"));
    };
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| WebError::not_found("No report from the last run"))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.xlsx".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn not_found() -> WebError {
    WebError::not_found("Page not found")
}

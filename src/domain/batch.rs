//! Backtest-then-report pipeline shared by the CLI and the dashboard.

use std::path::Path;

use crate::domain::backtest::{run_batch, BacktestOutcome, BacktestParams};
use crate::domain::error::DipbuyerError;
use crate::domain::report::{build_report, ReportOutcome};
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<BacktestOutcome>,
    pub report: ReportOutcome,
}

impl BatchReport {
    pub fn traded(&self) -> impl Iterator<Item = &crate::domain::backtest::BacktestResult> {
        self.outcomes.iter().filter_map(BacktestOutcome::result)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BacktestOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BacktestOutcome::Skipped { .. }))
    }
}

pub fn backtest_and_report(
    data_port: &dyn PriceDataPort,
    report_port: &dyn ReportPort,
    symbols: &[String],
    params: &BacktestParams,
    output_path: &Path,
) -> Result<BatchReport, DipbuyerError> {
    let outcomes = run_batch(data_port, symbols, params);
    let report = build_report(report_port, &outcomes, output_path)?;
    Ok(BatchReport { outcomes, report })
}

//! Report aggregation: success rate, sheet naming and the build entry point.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::backtest::{BacktestOutcome, BacktestResult, SummaryRecord};
use crate::domain::error::DipbuyerError;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_REPORT_FILE: &str = "Stock_Backtest_Report.xlsx";
pub const SUMMARY_SHEET: &str = "Summary";
pub const MAX_SHEET_NAME_LEN: usize = 30;

const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Usable results in batch order, each paired with its worksheet name.
#[derive(Debug)]
pub struct ReportBundle<'a> {
    entries: Vec<(String, &'a BacktestResult)>,
}

impl<'a> ReportBundle<'a> {
    /// Drops skipped outcomes and assigns sheet names. Fails when two symbols
    /// end up with the same sheet name.
    pub fn from_outcomes(outcomes: &'a [BacktestOutcome]) -> Result<Self, DipbuyerError> {
        let mut taken: HashMap<String, String> = HashMap::new();
        taken.insert(SUMMARY_SHEET.to_lowercase(), SUMMARY_SHEET.to_string());

        let mut entries = Vec::new();
        for result in outcomes.iter().filter_map(BacktestOutcome::result) {
            let name = sheet_name(&result.symbol);
            if let Some(first) = taken.get(&name.to_lowercase()) {
                return Err(DipbuyerError::SheetNameCollision {
                    sheet: name,
                    first: first.clone(),
                    second: result.symbol.clone(),
                });
            }
            taken.insert(name.to_lowercase(), result.symbol.clone());
            entries.push((name, result));
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(sheet name, result)` pairs in batch order.
    pub fn sheets(&self) -> impl Iterator<Item = (&str, &'a BacktestResult)> + '_ {
        self.entries.iter().map(|(name, r)| (name.as_str(), *r))
    }

    pub fn summaries(&self) -> impl Iterator<Item = &'a SummaryRecord> + '_ {
        self.entries.iter().map(|(_, r)| &r.summary)
    }

    pub fn success_rate(&self) -> f64 {
        success_rate(self.summaries())
    }
}

/// `sum(successful) / sum(total) * 100`, or 0 when no trade completed.
pub fn success_rate<'s>(summaries: impl IntoIterator<Item = &'s SummaryRecord>) -> f64 {
    let (successful, total) = summaries
        .into_iter()
        .fold((0usize, 0usize), |(s, t), rec| {
            (s + rec.successful_trades, t + rec.total_trades)
        });
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}

/// Worksheet name for a symbol: characters Excel rejects become `_`, then the
/// name is cut to [`MAX_SHEET_NAME_LEN`] characters. Excel also rejects an
/// apostrophe at either end, so those become `_` too.
pub fn sheet_name(symbol: &str) -> String {
    let mut chars: Vec<char> = symbol
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if let Some(first) = chars.first_mut().filter(|c| **c == '\'') {
        *first = '_';
    }
    if let Some(last) = chars.last_mut().filter(|c| **c == '\'') {
        *last = '_';
    }
    chars.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    NothingToReport,
    Generated {
        path: PathBuf,
        symbols: usize,
        success_rate: f64,
    },
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::NothingToReport => write!(f, "Nothing to report"),
            ReportOutcome::Generated {
                symbols,
                success_rate,
                ..
            } => write!(
                f,
                "Report generated with {symbols} stocks\nSuccess Rate: {success_rate:.2}%"
            ),
        }
    }
}

/// Writes the workbook for every usable outcome. Nothing is written when all
/// outcomes were skipped.
pub fn build_report(
    report_port: &dyn ReportPort,
    outcomes: &[BacktestOutcome],
    output_path: &Path,
) -> Result<ReportOutcome, DipbuyerError> {
    let bundle = ReportBundle::from_outcomes(outcomes)?;
    if bundle.is_empty() {
        info!("no usable results, report not written");
        return Ok(ReportOutcome::NothingToReport);
    }

    report_port.write(&bundle, output_path)?;
    let outcome = ReportOutcome::Generated {
        path: output_path.to_path_buf(),
        symbols: bundle.len(),
        success_rate: bundle.success_rate(),
    };
    info!(path = %output_path.display(), symbols = bundle.len(), "report written");
    Ok(outcome)
}

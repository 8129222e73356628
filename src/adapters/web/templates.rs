//! HTML templates using Askama.

use askama::Template;

use crate::domain::backtest::BacktestOutcome;
use crate::domain::batch::BatchReport;
use crate::domain::report::ReportOutcome;

use super::FormDefaults;

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>dipbuyer</title></head>
<body>
<h1>Buy-the-dip backtest</h1>
<form method="post" action="/backtest">
  <p><label>Symbols <input name="symbols" value="{{ symbols }}" placeholder="AAPL, MSFT"></label></p>
  <p><label>Buy drop % <input name="buy_drop_pct" value="{{ buy_drop_pct }}"></label></p>
  <p><label>Sell profit % <input name="sell_profit_pct" value="{{ sell_profit_pct }}"></label></p>
  <p><label>Start date <input name="start_date" type="date" value="{{ start_date }}"></label></p>
  <p><button type="submit">Run backtest</button></p>
</form>
</body>
</html>"#
)]
pub struct DashboardTemplate<'a> {
    pub symbols: &'a str,
    pub buy_drop_pct: f64,
    pub sell_profit_pct: f64,
    pub start_date: &'a str,
}

impl<'a> DashboardTemplate<'a> {
    pub fn new(defaults: &'a FormDefaults) -> Self {
        Self {
            symbols: &defaults.symbols,
            buy_drop_pct: defaults.buy_drop_pct,
            sell_profit_pct: defaults.sell_profit_pct,
            start_date: &defaults.start_date,
        }
    }
}

pub struct SummaryRow<'a> {
    pub symbol: &'a str,
    pub bars: usize,
    pub buys: usize,
    pub sells: usize,
    pub successful: usize,
}

pub struct SkippedRow<'a> {
    pub symbol: &'a str,
    pub reason: String,
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>dipbuyer results</title></head>
<body>
<h1>Results</h1>
{% if rows.is_empty() %}
<p>No usable results.</p>
{% else %}
<table>
  <tr><th>Symbol</th><th>Bars</th><th>Buys</th><th>Sells</th><th>On target</th></tr>
  {% for row in rows %}
  <tr><td>{{ row.symbol }}</td><td>{{ row.bars }}</td><td>{{ row.buys }}</td><td>{{ row.sells }}</td><td>{{ row.successful }}</td></tr>
  {% endfor %}
</table>
{% endif %}
{% if !skipped.is_empty() %}
<h2>Skipped</h2>
<ul>
  {% for s in skipped %}
  <li>{{ s.symbol }}: {{ s.reason }}</li>
  {% endfor %}
</ul>
{% endif %}
<pre class="report">{{ message }}</pre>
{% if has_report %}<p><a href="/report">Download workbook</a></p>{% endif %}
<p><a href="/">New backtest</a></p>
</body>
</html>"#
)]
pub struct ResultsTemplate<'a> {
    pub rows: Vec<SummaryRow<'a>>,
    pub skipped: Vec<SkippedRow<'a>>,
    pub message: String,
    pub has_report: bool,
}

impl<'a> ResultsTemplate<'a> {
    pub fn new(batch: &'a BatchReport) -> Self {
        let rows = batch
            .traded()
            .map(|r| SummaryRow {
                symbol: &r.symbol,
                bars: r.trades.len(),
                buys: r.summary.open_positions,
                sells: r.summary.total_trades,
                successful: r.summary.successful_trades,
            })
            .collect();
        let skipped = batch
            .skipped()
            .filter_map(|o| match o {
                BacktestOutcome::Skipped { symbol, reason } => Some(SkippedRow {
                    symbol,
                    reason: reason.to_string(),
                }),
                BacktestOutcome::Traded(_) => None,
            })
            .collect();
        Self {
            rows,
            skipped,
            message: batch.report.to_string(),
            has_report: matches!(batch.report, ReportOutcome::Generated { .. }),
        }
    }
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Error {{ status }}</title></head>
<body>
<h1>Error {{ status }}</h1>
<p class="error">{{ message }}</p>
<p><a href="/">Back</a></p>
</body>
</html>"#
)]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

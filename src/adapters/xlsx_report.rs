//! Excel workbook adapter implementing ReportPort.
//!
//! Layout: a "Summary" sheet with one row per symbol, followed by one sheet
//! per symbol holding its full trade log.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};

use crate::domain::backtest::{TradeRecord, TradeStatus};
use crate::domain::error::DipbuyerError;
use crate::domain::report::{ReportBundle, SUMMARY_SHEET};
use crate::ports::report_port::ReportPort;

const SUMMARY_HEADERS: [&str; 4] = [
    "Symbol",
    "Total_Trades",
    "Open_Positions",
    "Successful_Trades",
];

const TRADE_HEADERS: [&str; 10] = [
    "Date",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "Buy_Price",
    "Sell_Price",
    "Status",
    "Target_Achieved",
];

#[derive(Debug, Default)]
pub struct XlsxReportAdapter;

impl XlsxReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for XlsxReportAdapter {
    fn write(&self, bundle: &ReportBundle<'_>, output_path: &Path) -> Result<(), DipbuyerError> {
        let mut workbook = build_workbook(bundle).map_err(report_error)?;
        workbook.save(output_path).map_err(report_error)
    }
}

fn build_workbook(bundle: &ReportBundle<'_>) -> Result<Workbook, XlsxError> {
    let header = Format::new().set_bold();
    let formats = RowFormats {
        price: Format::new().set_num_format("0.00"),
        date: Format::new().set_num_format("yyyy-mm-dd"),
    };

    let mut workbook = Workbook::new();

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_headers(summary, &SUMMARY_HEADERS, &header)?;
    for (i, rec) in bundle.summaries().enumerate() {
        let row = i as u32 + 1;
        summary.write_string(row, 0, rec.symbol.as_str())?;
        summary.write_number(row, 1, rec.total_trades as f64)?;
        summary.write_number(row, 2, rec.open_positions as f64)?;
        summary.write_number(row, 3, rec.successful_trades as f64)?;
    }
    summary.set_column_width(0, 14)?;

    for (name, result) in bundle.sheets() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_headers(sheet, &TRADE_HEADERS, &header)?;
        for (i, trade) in result.trades.iter().enumerate() {
            write_trade_row(sheet, i as u32 + 1, trade, &formats)?;
        }
        sheet.set_column_width(0, 12)?;
    }

    Ok(workbook)
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, format)?;
    }
    Ok(())
}

struct RowFormats {
    price: Format,
    date: Format,
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime, XlsxError> {
    ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)
}

fn write_trade_row(
    sheet: &mut Worksheet,
    row: u32,
    trade: &TradeRecord,
    formats: &RowFormats,
) -> Result<(), XlsxError> {
    let bar = &trade.bar;
    let price = &formats.price;
    sheet.write_datetime_with_format(row, 0, &excel_date(bar.date)?, &formats.date)?;
    sheet.write_number_with_format(row, 1, bar.open, price)?;
    sheet.write_number_with_format(row, 2, bar.high, price)?;
    sheet.write_number_with_format(row, 3, bar.low, price)?;
    sheet.write_number_with_format(row, 4, bar.close, price)?;
    sheet.write_number(row, 5, bar.volume as f64)?;
    if let Some(p) = trade.buy_price {
        sheet.write_number_with_format(row, 6, p, price)?;
    }
    if let Some(p) = trade.sell_price {
        sheet.write_number_with_format(row, 7, p, price)?;
    }
    if trade.status != TradeStatus::None {
        sheet.write_string(row, 8, trade.status.label())?;
    }
    if trade.target_achieved {
        sheet.write_string(row, 9, "Yes")?;
    }
    Ok(())
}

fn report_error(err: XlsxError) -> DipbuyerError {
    DipbuyerError::Report {
        reason: err.to_string(),
    }
}

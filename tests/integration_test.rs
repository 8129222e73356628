//! Integration tests for the backtest-then-report pipeline.
//!
//! Tests cover:
//! - Batch runs with a mock data port, including skipped symbols
//! - Typed skip reasons for missing, transient and short series
//! - Workbook written through the XLSX adapter, or not written at all
//! - CSV directory source feeding the full pipeline

mod common;

use approx::assert_relative_eq;
use calamine::{open_workbook, Data, Reader, Xlsx};
use common::*;
use dipbuyer::adapters::csv_adapter::CsvAdapter;
use dipbuyer::adapters::xlsx_report::XlsxReportAdapter;
use dipbuyer::domain::backtest::{
    backtest, run_batch, BacktestOutcome, SkipReason, SummaryRecord, TradeStatus,
};
use dipbuyer::domain::batch::backtest_and_report;
use dipbuyer::domain::error::{DipbuyerError, FetchError};
use dipbuyer::domain::report::{build_report, ReportOutcome};
use std::fs;
use tempfile::TempDir;

mod backtester {
    use super::*;

    #[test]
    fn drop_and_recovery_through_data_port() {
        let port = MockDataPort::new().with_closes("AAPL", &[100.0, 96.0, 101.0]);
        let outcome = backtest(&port, "AAPL", &default_params());

        let result = outcome.result().expect("traded");
        assert_eq!(
            result.summary,
            SummaryRecord {
                symbol: "AAPL".into(),
                total_trades: 1,
                open_positions: 1,
                successful_trades: 1,
            }
        );
        assert_eq!(result.trades[1].status, TradeStatus::Bought);
        assert_eq!(result.trades[2].status, TradeStatus::Sold);
    }

    #[test]
    fn unknown_symbol_is_skipped_not_found() {
        let port = MockDataPort::new();
        let outcome = backtest(&port, "NOPE", &default_params());
        assert_eq!(
            outcome,
            BacktestOutcome::Skipped {
                symbol: "NOPE".into(),
                reason: SkipReason::NotFound
            }
        );
    }

    #[test]
    fn transient_failure_is_distinguishable() {
        let port = MockDataPort::new().with_error(
            "MSFT",
            FetchError::Transient {
                symbol: "MSFT".into(),
                reason: "connection reset".into(),
            },
        );
        let outcome = backtest(&port, "MSFT", &default_params());
        assert!(matches!(
            outcome,
            BacktestOutcome::Skipped {
                reason: SkipReason::Transient { .. },
                ..
            }
        ));
    }

    #[test]
    fn date_range_is_passed_to_port() {
        let port = MockDataPort::new().with_closes("AAPL", &[100.0, 96.0, 101.0, 90.0]);
        let mut params = default_params();
        params.end_date = date(2024, 1, 1);
        let outcome = backtest(&port, "AAPL", &params);
        assert_eq!(
            outcome,
            BacktestOutcome::Skipped {
                symbol: "AAPL".into(),
                reason: SkipReason::InsufficientData { bars: 1 }
            }
        );
    }

    #[test]
    fn batch_keeps_order_and_continues_past_failures() {
        let port = CountingPort::new(
            MockDataPort::new()
                .with_closes("AAPL", &[100.0, 96.0, 101.0])
                .with_closes("MSFT", &[10.0, 10.1, 10.2]),
        );
        let outcomes = run_batch(&port, &symbols(&["AAPL", "BAD", "MSFT"]), &default_params());

        assert_eq!(*port.calls.borrow(), vec!["AAPL", "BAD", "MSFT"]);
        let order: Vec<&str> = outcomes.iter().map(|o| o.symbol()).collect();
        assert_eq!(order, vec!["AAPL", "BAD", "MSFT"]);
        assert!(outcomes[0].result().is_some());
        assert!(outcomes[1].result().is_none());
        assert!(outcomes[2].result().is_some());
    }

    #[test]
    fn batch_is_repeatable() {
        let port = MockDataPort::new().with_closes("AAPL", &[100.0, 96.0, 99.0, 101.0, 97.0, 92.0]);
        let list = symbols(&["AAPL"]);
        assert_eq!(
            run_batch(&port, &list, &default_params()),
            run_batch(&port, &list, &default_params())
        );
    }
}

mod report_builder {
    use super::*;

    #[test]
    fn writes_workbook_and_reports_success_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Stock_Backtest_Report.xlsx");
        let port = MockDataPort::new()
            .with_closes("AAPL", &[100.0, 96.0, 101.0])
            .with_closes("TSLA", &[100.0, 90.0, 88.0]);

        let batch = backtest_and_report(
            &port,
            &XlsxReportAdapter::new(),
            &symbols(&["AAPL", "TSLA", "GONE"]),
            &default_params(),
            &path,
        )
        .unwrap();

        match &batch.report {
            ReportOutcome::Generated {
                symbols,
                success_rate,
                ..
            } => {
                assert_eq!(*symbols, 2);
                assert_relative_eq!(*success_rate, 100.0);
            }
            other => panic!("expected report, got {other:?}"),
        }
        assert_eq!(batch.skipped().count(), 1);
        assert!(fs::read(&path).unwrap().starts_with(b"PK"));
        assert!(batch.report.to_string().starts_with("Report generated with 2 stocks"));
    }

    fn cell(range: &calamine::Range<Data>, row: u32, col: u32) -> Data {
        range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
    }

    #[test]
    fn workbook_layout_matches_trade_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.xlsx");
        let port = MockDataPort::new()
            .with_closes("AAPL", &[100.0, 96.0, 101.0])
            .with_closes("BRK-B", &[50.0, 50.5, 51.0]);

        backtest_and_report(
            &port,
            &XlsxReportAdapter::new(),
            &symbols(&["AAPL", "BRK-B"]),
            &default_params(),
            &path,
        )
        .unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Summary", "AAPL", "BRK-B"]);

        let summary = workbook.worksheet_range("Summary").unwrap();
        let headers: Vec<Data> = (0..4).map(|c| cell(&summary, 0, c)).collect();
        assert_eq!(
            headers,
            vec![
                Data::String("Symbol".into()),
                Data::String("Total_Trades".into()),
                Data::String("Open_Positions".into()),
                Data::String("Successful_Trades".into()),
            ]
        );
        assert_eq!(cell(&summary, 1, 0), Data::String("AAPL".into()));
        assert_eq!(cell(&summary, 1, 1), Data::Float(1.0));
        assert_eq!(cell(&summary, 1, 2), Data::Float(1.0));
        assert_eq!(cell(&summary, 1, 3), Data::Float(1.0));
        assert_eq!(cell(&summary, 2, 0), Data::String("BRK-B".into()));
        assert_eq!(cell(&summary, 2, 1), Data::Float(0.0));

        let trades = workbook.worksheet_range("AAPL").unwrap();
        assert_eq!(cell(&trades, 0, 0), Data::String("Date".into()));
        assert_eq!(cell(&trades, 0, 9), Data::String("Target_Achieved".into()));
        assert!(matches!(cell(&trades, 1, 0), Data::DateTime(_)));

        // first bar: no signal
        assert_eq!(cell(&trades, 1, 6), Data::Empty);
        assert_eq!(cell(&trades, 1, 8), Data::Empty);

        // second bar: bought at 96, no sell price yet
        assert_eq!(cell(&trades, 2, 4), Data::Float(96.0));
        assert_eq!(cell(&trades, 2, 6), Data::Float(96.0));
        assert_eq!(cell(&trades, 2, 7), Data::Empty);
        assert_eq!(cell(&trades, 2, 8), Data::String("Bought".into()));
        assert_eq!(cell(&trades, 2, 9), Data::Empty);

        // third bar: sold at 101 on target
        assert_eq!(cell(&trades, 3, 6), Data::Empty);
        assert_eq!(cell(&trades, 3, 7), Data::Float(101.0));
        assert_eq!(cell(&trades, 3, 8), Data::String("Sold".into()));
        assert_eq!(cell(&trades, 3, 9), Data::String("Yes".into()));
    }

    #[test]
    fn apostrophe_sheet_name_does_not_lose_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xlsx");
        let port = MockDataPort::new()
            .with_closes("AAPL", &[100.0, 96.0, 101.0])
            .with_closes("'X", &[10.0, 11.0]);

        let outcomes = run_batch(&port, &symbols(&["AAPL", "'X"]), &default_params());
        let report = build_report(&XlsxReportAdapter::new(), &outcomes, &path).unwrap();

        assert!(matches!(report, ReportOutcome::Generated { symbols: 2, .. }));
        let workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Summary", "AAPL", "_X"]);
    }

    #[test]
    fn zero_completed_trades_gives_zero_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xlsx");
        let port = MockDataPort::new().with_closes("FLAT", &[10.0, 10.0, 10.0]);
        let outcomes = run_batch(&port, &symbols(&["FLAT"]), &default_params());

        let report = build_report(&XlsxReportAdapter::new(), &outcomes, &path).unwrap();
        assert!(matches!(
            report,
            ReportOutcome::Generated { success_rate, .. } if success_rate == 0.0
        ));
        assert!(report.to_string().ends_with("Success Rate: 0.00%"));
    }

    #[test]
    fn nothing_to_report_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xlsx");
        let port = MockDataPort::new().with_closes("ONE", &[10.0]);

        let batch = backtest_and_report(
            &port,
            &XlsxReportAdapter::new(),
            &symbols(&["ONE", "MISSING"]),
            &default_params(),
            &path,
        )
        .unwrap();

        assert_eq!(batch.report, ReportOutcome::NothingToReport);
        assert!(!path.exists());
    }

    #[test]
    fn empty_result_list_is_nothing_to_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xlsx");
        let report = build_report(&XlsxReportAdapter::new(), &[], &path).unwrap();
        assert_eq!(report, ReportOutcome::NothingToReport);
        assert!(!path.exists());
    }

    #[test]
    fn colliding_sheet_names_abort_before_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xlsx");
        let long_a = format!("{}A", "X".repeat(30));
        let long_b = format!("{}B", "X".repeat(30));
        let port = MockDataPort::new()
            .with_closes(&long_a, &[1.0, 2.0])
            .with_closes(&long_b, &[1.0, 2.0]);

        let err = backtest_and_report(
            &port,
            &XlsxReportAdapter::new(),
            &[long_a.clone(), long_b.clone()],
            &default_params(),
            &path,
        )
        .unwrap_err();

        assert!(matches!(err, DipbuyerError::SheetNameCollision { .. }));
        assert!(!path.exists());
    }
}

mod csv_source {
    use super::*;

    #[test]
    fn csv_directory_through_full_pipeline() {
        let data = TempDir::new().unwrap();
        fs::write(
            data.path().join("BHP.AX.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-02-01,45.0,45.5,44.5,45.0,1000\n\
             2024-02-02,44.0,44.0,43.0,43.2,1200\n\
             2024-02-05,44.0,45.5,43.8,45.5,900\n",
        )
        .unwrap();
        let out = TempDir::new().unwrap();
        let path = out.path().join("report.xlsx");

        let batch = backtest_and_report(
            &CsvAdapter::new(data.path().to_path_buf()),
            &XlsxReportAdapter::new(),
            &symbols(&["BHP.AX"]),
            &default_params(),
            &path,
        )
        .unwrap();

        let result = batch.traded().next().unwrap();
        // 45.0 -> 43.2 is a 4% drop, 43.2 -> 45.5 is a 5.3% gain
        assert_eq!(result.summary.open_positions, 1);
        assert_eq!(result.summary.total_trades, 1);
        assert!(path.exists());
    }
}

//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::xlsx_report::XlsxReportAdapter;
use crate::adapters::yahoo_adapter::{YahooAdapter, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::domain::backtest::{BacktestOutcome, BacktestParams};
use crate::domain::batch::{backtest_and_report, BatchReport};
use crate::domain::config_validation::{parse_date, timeout_secs, validate_config, DataSource};
use crate::domain::error::DipbuyerError;
use crate::domain::report::{ReportOutcome, DEFAULT_REPORT_FILE};
use crate::domain::strategy::{Thresholds, DEFAULT_BUY_DROP_PCT, DEFAULT_SELL_PROFIT_PCT};
use crate::domain::universe::{parse_symbol_args, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;

pub const DEFAULT_START_DATE: &str = "2024-01-01";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8501";

/// Exit code when every symbol was skipped and no report was written.
pub const EXIT_NOTHING_TO_REPORT: u8 = 5;

#[derive(Parser, Debug)]
#[command(name = "dipbuyer", about = "Buy-the-dip threshold backtester with Excel reports")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest symbols and write the Excel report
    Backtest(BacktestArgs),
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the web dashboard
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct BacktestArgs {
    /// Symbols, comma or space separated (overrides [backtest] symbols)
    pub symbols: Vec<String>,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Percentage one-day drop that opens a position
    #[arg(long)]
    pub buy_drop: Option<f64>,
    /// Percentage gain over the buy price that closes a position
    #[arg(long)]
    pub sell_profit: Option<f64>,
    #[arg(long)]
    pub start_date: Option<String>,
    #[arg(long)]
    pub end_date: Option<String>,
    /// yahoo or csv
    #[arg(long)]
    pub source: Option<String>,
    /// Directory of SYMBOL.csv files for the csv source
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Where price data comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub source: DataSource,
    pub data_dir: Option<PathBuf>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub symbols: Vec<String>,
    pub params: BacktestParams,
    pub data: DataSettings,
    pub output: PathBuf,
}

pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest(args) => run_backtest(&args),
        Command::Validate { config } => run_validate(&config),
        Command::Serve { config } => run_serve(config.as_ref()),
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = DipbuyerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_thresholds(
    config: &dyn ConfigPort,
    buy_drop: Option<f64>,
    sell_profit: Option<f64>,
) -> Result<Thresholds, DipbuyerError> {
    Thresholds::new(
        buy_drop.unwrap_or_else(|| {
            config.get_double("backtest", "buy_drop_pct", DEFAULT_BUY_DROP_PCT)
        }),
        sell_profit.unwrap_or_else(|| {
            config.get_double("backtest", "sell_profit_pct", DEFAULT_SELL_PROFIT_PCT)
        }),
    )
}

pub fn build_data_settings(
    config: &dyn ConfigPort,
    source_override: Option<&str>,
    data_dir_override: Option<&Path>,
) -> Result<DataSettings, DipbuyerError> {
    let source = match source_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "source"))
    {
        Some(s) => s.parse()?,
        None => DataSource::Yahoo,
    };
    let data_dir = data_dir_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "data_dir").map(PathBuf::from));
    if source == DataSource::Csv && data_dir.is_none() {
        return Err(DipbuyerError::ConfigMissing {
            section: "data".into(),
            key: "data_dir".into(),
        });
    }

    let timeout_secs = timeout_secs(config, DEFAULT_TIMEOUT_SECS)?;

    Ok(DataSettings {
        source,
        data_dir,
        base_url: config
            .get_string("data", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        timeout: Duration::from_secs(timeout_secs),
    })
}

pub fn build_run_settings(
    config: &dyn ConfigPort,
    args: &BacktestArgs,
    today: NaiveDate,
) -> Result<RunSettings, DipbuyerError> {
    let parsed = if !args.symbols.is_empty() {
        parse_symbol_args(&args.symbols)
    } else {
        let list = config
            .get_string("backtest", "symbols")
            .ok_or_else(|| DipbuyerError::ConfigMissing {
                section: "backtest".into(),
                key: "symbols".into(),
            })?;
        parse_symbols(&list)
    };
    let symbols =
        parsed.map_err(|e| DipbuyerError::invalid("backtest", "symbols", e.to_string()))?;

    let thresholds = build_thresholds(config, args.buy_drop, args.sell_profit)?;

    let start_str = args
        .start_date
        .clone()
        .or_else(|| config.get_string("backtest", "start_date"))
        .unwrap_or_else(|| DEFAULT_START_DATE.to_string());
    let start_date = parse_date("backtest", "start_date", &start_str)?;

    let end_date = match args
        .end_date
        .clone()
        .or_else(|| config.get_string("backtest", "end_date"))
    {
        Some(s) => parse_date("backtest", "end_date", &s)?,
        None => today,
    };
    if end_date < start_date {
        return Err(DipbuyerError::invalid(
            "backtest",
            "end_date",
            "end_date must not be before start_date",
        ));
    }

    let data = build_data_settings(config, args.source.as_deref(), args.data_dir.as_deref())?;

    let output = args
        .output
        .clone()
        .or_else(|| config.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE));

    Ok(RunSettings {
        symbols,
        params: BacktestParams {
            thresholds,
            start_date,
            end_date,
        },
        data,
        output,
    })
}

pub fn build_data_port(
    settings: &DataSettings,
) -> Result<Box<dyn PriceDataPort + Send + Sync>, DipbuyerError> {
    match settings.source {
        DataSource::Yahoo => {
            debug!(base_url = %settings.base_url, "using yahoo data source");
            Ok(Box::new(YahooAdapter::new(&settings.base_url, settings.timeout)?))
        }
        DataSource::Csv => {
            let dir = settings
                .data_dir
                .clone()
                .ok_or_else(|| DipbuyerError::ConfigMissing {
                    section: "data".into(),
                    key: "data_dir".into(),
                })?;
            debug!(dir = %dir.display(), "using csv data source");
            Ok(Box::new(CsvAdapter::new(dir)))
        }
    }
}

fn run_backtest(args: &BacktestArgs) -> ExitCode {
    let adapter = match load_config(args.config.as_ref()) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let settings = match build_run_settings(&adapter, args, Local::now().date_naive()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_port = match build_data_port(&settings.data) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    run_backtest_pipeline(data_port.as_ref(), &XlsxReportAdapter::new(), &settings)
}

pub fn run_backtest_pipeline(
    data_port: &dyn PriceDataPort,
    report_port: &dyn crate::ports::report_port::ReportPort,
    settings: &RunSettings,
) -> ExitCode {
    eprintln!(
        "Running backtest: {} symbols, {} to {} (buy drop {}%, sell profit {}%)",
        settings.symbols.len(),
        settings.params.start_date,
        settings.params.end_date,
        settings.params.thresholds.buy_drop_pct(),
        settings.params.thresholds.sell_profit_pct(),
    );

    let batch = match backtest_and_report(
        data_port,
        report_port,
        &settings.symbols,
        &settings.params,
        &settings.output,
    ) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_console_summary(&batch);

    match &batch.report {
        ReportOutcome::NothingToReport => {
            eprintln!("\nNo usable results; report not written");
            ExitCode::from(EXIT_NOTHING_TO_REPORT)
        }
        generated @ ReportOutcome::Generated { path, .. } => {
            println!("{generated}");
            eprintln!("\nReport written to: {}", path.display());
            ExitCode::SUCCESS
        }
    }
}

fn print_console_summary(batch: &BatchReport) {
    let traded: Vec<_> = batch.traded().collect();
    if !traded.is_empty() {
        eprintln!("\n=== Per-Symbol Summary ===");
        for r in &traded {
            let s = &r.summary;
            eprintln!(
                "  {}:  {} bars, {} buys, {} sells, {} on target",
                s.symbol,
                r.trades.len(),
                s.open_positions,
                s.total_trades,
                s.successful_trades,
            );
        }
    }

    let skipped: Vec<_> = batch.skipped().collect();
    if !skipped.is_empty() {
        eprintln!("\n=== Skipped ===");
        for outcome in skipped {
            if let BacktestOutcome::Skipped { symbol, reason } = outcome {
                eprintln!("  {}: {}", symbol, reason);
            }
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(Some(config_path)) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let args = BacktestArgs::default();
    match build_run_settings(&adapter, &args, Local::now().date_naive()) {
        Ok(settings) => {
            eprintln!("\nSymbols:     {}", settings.symbols.join(", "));
            eprintln!(
                "Thresholds:  buy drop {}%, sell profit {}%",
                settings.params.thresholds.buy_drop_pct(),
                settings.params.thresholds.sell_profit_pct()
            );
            eprintln!(
                "Range:       {} to {}",
                settings.params.start_date, settings.params.end_date
            );
            eprintln!("Source:      {:?}", settings.data.source);
            eprintln!("Output:      {}", settings.output.display());
        }
        // symbols may legitimately come from the command line instead
        Err(DipbuyerError::ConfigMissing { key, .. }) if key == "symbols" => {
            eprintln!("\nNo [backtest] symbols configured; pass them on the command line");
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_serve(config_path: Option<&PathBuf>) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState, FormDefaults};
        use std::net::SocketAddr;
        use std::sync::Arc;
        use tracing::{error, info};

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };
        if let Err(e) = validate_config(&config) {
            eprintln!("error: {e}");
            return (&e).into();
        }

        let data_settings = match build_data_settings(&config, None, None) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        let data_port = match build_data_port(&data_settings) {
            Ok(p) => Arc::from(p),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let listen = config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = match listen.parse() {
            Ok(a) => a,
            Err(_) => {
                let err = DipbuyerError::invalid("web", "listen", format!("invalid address {listen:?}"));
                eprintln!("error: {err}");
                return (&err).into();
            }
        };

        let state = AppState::new(
            data_port,
            Arc::new(XlsxReportAdapter::new()),
            config
                .get_string("report", "output")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE)),
            FormDefaults::from_config(&config),
        );
        let router = build_router(state);

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("error: failed to start runtime: {e}");
                return ExitCode::from(1);
            }
        };

        let served: std::io::Result<()> = runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Dashboard listening on http://{}", addr);
            axum::serve(listener, router).await
        });

        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("server error: {}", e);
                ExitCode::from(1)
            }
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}

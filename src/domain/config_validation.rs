//! Configuration validation.
//!
//! Validates every config field before a batch runs. Missing keys are fine
//! here; they fall back to defaults when settings are built.

use std::str::FromStr;

use crate::domain::error::DipbuyerError;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Yahoo,
    Csv,
}

impl FromStr for DataSource {
    type Err = DipbuyerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(DataSource::Yahoo),
            "csv" => Ok(DataSource::Csv),
            other => Err(DipbuyerError::invalid(
                "data",
                "source",
                format!("unknown source {other:?} (expected yahoo or csv)"),
            )),
        }
    }
}

pub fn parse_date(section: &str, key: &str, value: &str) -> Result<NaiveDate, DipbuyerError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        DipbuyerError::invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
    })
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), DipbuyerError> {
    validate_backtest_config(config)?;
    validate_data_config(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), DipbuyerError> {
    validate_symbols(config)?;
    validate_percentage(config, "buy_drop_pct")?;
    validate_percentage(config, "sell_profit_pct")?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), DipbuyerError> {
    let source = match config.get_string("data", "source") {
        Some(s) => s.parse()?,
        None => DataSource::Yahoo,
    };
    if source == DataSource::Csv && config.get_string("data", "data_dir").is_none() {
        return Err(DipbuyerError::ConfigMissing {
            section: "data".to_string(),
            key: "data_dir".to_string(),
        });
    }
    timeout_secs(config, 1)?;
    Ok(())
}

/// Reads `[data] timeout_secs`, falling back to `default` when unset.
/// Anything other than a positive whole number is rejected.
pub fn timeout_secs(config: &dyn ConfigPort, default: u64) -> Result<u64, DipbuyerError> {
    let Some(raw) = config.get_string("data", "timeout_secs") else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(DipbuyerError::invalid(
            "data",
            "timeout_secs",
            "timeout_secs must be a positive whole number of seconds",
        )),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), DipbuyerError> {
    if let Some(list) = config.get_string("backtest", "symbols") {
        parse_symbols(&list).map_err(|e| DipbuyerError::invalid("backtest", "symbols", e.to_string()))?;
    }
    Ok(())
}

fn validate_percentage(config: &dyn ConfigPort, key: &str) -> Result<(), DipbuyerError> {
    let Some(raw) = config.get_string("backtest", key) else {
        return Ok(());
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        _ => Err(DipbuyerError::invalid(
            "backtest",
            key,
            format!("{key} must be a positive percentage"),
        )),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), DipbuyerError> {
    let start = config
        .get_string("backtest", "start_date")
        .map(|s| parse_date("backtest", "start_date", &s))
        .transpose()?;
    let end = config
        .get_string("backtest", "end_date")
        .map(|s| parse_date("backtest", "end_date", &s))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(DipbuyerError::invalid(
                "backtest",
                "end_date",
                "end_date must not be before start_date",
            ));
        }
    }
    Ok(())
}

//! Core domain types and logic.

pub mod price;
pub mod position;
pub mod strategy;
pub mod backtest;
pub mod report;
pub mod batch;
pub mod universe;
pub mod config_validation;
pub mod error;

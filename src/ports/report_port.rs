//! Report generation port.

use std::path::Path;

use crate::domain::error::DipbuyerError;
use crate::domain::report::ReportBundle;

/// Port for writing backtest reports.
pub trait ReportPort {
    /// Writes the bundle to `output_path`, replacing any existing file.
    fn write(&self, bundle: &ReportBundle<'_>, output_path: &Path) -> Result<(), DipbuyerError>;
}

//! Price data access port.

use crate::domain::error::FetchError;
use crate::domain::price::DailyBar;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Daily bars for `symbol` with `start_date <= date <= end_date`, ascending.
    fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, FetchError>;
}

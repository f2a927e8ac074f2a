//! Market data access port trait.

use crate::domain::error::CopulaTraderError;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Closing prices of `series` within `[start_date, end_date]`.
    ///
    /// An unknown identifier or a range without rows is
    /// [`CopulaTraderError::DataUnavailable`].
    fn fetch_closes(
        &self,
        series: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, CopulaTraderError>;

    fn list_series(&self) -> Result<Vec<String>, CopulaTraderError>;
}

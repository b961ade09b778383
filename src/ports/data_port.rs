//! Market data provider port.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

/// Source of raw minute bars, one calendar day at a time.
pub trait DataPort {
    /// Bars for `symbol` whose timestamp falls on `day` (UTC), in time order.
    /// A day with no data yields an empty vector, not an error.
    fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<Vec<Bar>, ScannerError>;
}

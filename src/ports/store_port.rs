//! Bar cache port.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use chrono::{DateTime, Utc};

pub trait BarStore {
    /// Inserts bars keyed by `(symbol, ts)`. Rows already present are left
    /// untouched. Returns the number of rows actually written.
    fn insert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<usize, ScannerError>;

    /// Cached bars with `start <= ts <= end`, ordered by timestamp.
    fn fetch_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScannerError>;

    /// First timestamp, last timestamp and row count for `symbol`.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, ScannerError>;

    fn list_symbols(&self) -> Result<Vec<String>, ScannerError>;
}

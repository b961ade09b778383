//! Summary statistics over a filter result column.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Totals over every nonzero, defined cell of a result column.
///
/// With no trades `count` is 0, `pnl` is 0 and `mean`/`median` are `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSummary {
    pub pnl: f64,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

impl ReportSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                pnl: 0.0,
                count: 0,
                mean: f64::NAN,
                median: f64::NAN,
            };
        }

        let pnl: f64 = values.iter().sum();
        Self {
            pnl,
            count,
            mean: pnl / count as f64,
            median: median(values),
        }
    }

    pub fn has_trades(&self) -> bool {
        self.count > 0
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pnl={:.4} count={} mean={:.4} median={:.4}",
            self.pnl, self.count, self.mean, self.median
        )
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// The `(ts, value)` rows of `field` that count as trades.
pub fn trades(series: &BarSeries, field: &str) -> Result<Vec<(DateTime<Utc>, f64)>, ScannerError> {
    let column = series
        .column(field)
        .ok_or_else(|| ScannerError::missing_column(field))?;

    Ok(series
        .bars
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| match column.get(i) {
            Some(v) if v != 0.0 && !v.is_nan() => Some((bar.ts, v)),
            _ => None,
        })
        .collect())
}

pub fn analyze(series: &BarSeries, field: &str) -> Result<ReportSummary, ScannerError> {
    let values: Vec<f64> = trades(series, field)?.into_iter().map(|(_, v)| v).collect();
    Ok(ReportSummary::from_values(&values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn series_with(values: Vec<Option<f64>>) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2020, 8, 3, 14, 0, 0).unwrap();
        let bars = (0..values.len())
            .map(|i| Bar {
                ts: start + Duration::minutes(i as i64),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
                rth: None,
            })
            .collect();
        let mut series = BarSeries::new("/MES", bars);
        series.insert_values("pnl", values);
        series
    }

    #[test]
    fn analyze_skips_zero_and_undefined() {
        let series = series_with(vec![Some(0.0), Some(5.0), Some(-3.0), None, Some(0.0), Some(2.0)]);
        let summary = analyze(&series, "pnl").unwrap();

        assert_relative_eq!(summary.pnl, 4.0);
        assert_eq!(summary.count, 3);
        assert_relative_eq!(summary.mean, 4.0 / 3.0);
        assert_relative_eq!(summary.median, 2.0);
    }

    #[test]
    fn even_count_median_is_midpoint() {
        let summary = ReportSummary::from_values(&[4.0, -1.0, 3.0, 1.0]);
        assert_relative_eq!(summary.median, 2.0);
    }

    #[test]
    fn no_trades_reports_nan_averages() {
        let summary = analyze(&series_with(vec![None, Some(0.0)]), "pnl").unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.pnl, 0.0);
        assert!(summary.mean.is_nan());
        assert!(summary.median.is_nan());
        assert!(!summary.has_trades());
    }

    #[test]
    fn trades_keep_timestamps() {
        let series = series_with(vec![None, Some(1.5), Some(0.0)]);
        let rows = trades(&series, "pnl").unwrap();
        assert_eq!(rows, vec![(series.bars[1].ts, 1.5)]);
    }

    #[test]
    fn unknown_field() {
        let err = analyze(&series_with(vec![]), "other").unwrap_err();
        assert!(matches!(err, ScannerError::MissingColumn { field } if field == "other"));
    }
}

//! Boolean AND over several signal columns.
//!
//! Emits the common sign where every named signal is nonzero and they all
//! agree, 0 everywhere else. Every name must be a signal column; a values
//! column such as a VWAP output is rejected with `ColumnType`.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::indicator::{Indicator, IndicatorParam, IndicatorParams};

pub fn combine_signals(columns: &[&[i8]], len: usize) -> Vec<i8> {
    (0..len)
        .map(|i| {
            let mut signs = columns.iter().map(|c| c.get(i).copied().unwrap_or(0));
            match signs.next() {
                Some(first) if first != 0 && signs.all(|s| s == first) => first,
                _ => 0,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CombinedBinary {
    field_name: String,
    params: IndicatorParams,
}

impl CombinedBinary {
    pub fn new(field_name: &str, params: IndicatorParams) -> Self {
        Self {
            field_name: field_name.to_string(),
            params,
        }
    }
}

impl Indicator for CombinedBinary {
    fn name(&self) -> &'static str {
        "CombinedBinary"
    }

    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn params(&self) -> &IndicatorParams {
        &self.params
    }

    fn required_params(&self) -> &'static [IndicatorParam] {
        &[IndicatorParam::FieldNames]
    }

    fn apply(&self, series: &mut BarSeries) -> Result<(), ScannerError> {
        self.validate()?;
        let names = self.params.fields(self.name(), IndicatorParam::FieldNames)?;

        let columns = names
            .iter()
            .map(|name| series.signal(name))
            .collect::<Result<Vec<_>, _>>()?;
        let combined = combine_signals(&columns, series.len());

        series.insert_signal(&self.field_name, combined);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::{Duration, TimeZone, Utc};

    fn make_series(n: usize) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2020, 8, 3, 14, 0, 0).unwrap();
        let bars = (0..n)
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
        BarSeries::new("/MES", bars)
    }

    #[test]
    fn combine_requires_agreement() {
        let a: &[i8] = &[1, 1, -1, 0, -1];
        let b: &[i8] = &[1, -1, -1, 0, 0];
        assert_eq!(combine_signals(&[a, b], 5), vec![1, 0, -1, 0, 0]);
    }

    #[test]
    fn combined_binary_writes_composite() {
        let mut series = make_series(4);
        series.insert_signal("short_cross", vec![1, 0, -1, 1]);
        series.insert_signal("long_cross", vec![1, 1, -1, -1]);

        let indicator = CombinedBinary::new(
            "composite",
            IndicatorParams::new()
                .with(IndicatorParam::FieldNames, vec!["short_cross", "long_cross"]),
        );
        indicator.apply(&mut series).unwrap();

        assert_eq!(series.signal("composite").unwrap(), &[1, 0, -1, 0]);
    }

    #[test]
    fn combined_binary_unknown_field() {
        let mut series = make_series(2);
        series.insert_signal("a", vec![0, 1]);
        let indicator = CombinedBinary::new(
            "composite",
            IndicatorParams::new().with(IndicatorParam::FieldNames, vec!["a", "b"]),
        );
        let err = indicator.apply(&mut series).unwrap_err();
        assert!(matches!(err, ScannerError::MissingColumn { field } if field == "b"));
    }

    #[test]
    fn combined_binary_rejects_value_columns() {
        let mut series = make_series(2);
        series.insert_signal("a", vec![0, 1]);
        series.insert_values("vwap", vec![None, Some(1.0)]);
        let indicator = CombinedBinary::new(
            "composite",
            IndicatorParams::new().with(IndicatorParam::FieldNames, vec!["a", "vwap"]),
        );
        let err = indicator.apply(&mut series).unwrap_err();
        assert_eq!(err.to_string(), "column vwap is not a signal column");
        assert!(!series.has_column("composite"));
    }

    #[test]
    fn combined_binary_requires_field_names() {
        let mut series = make_series(1);
        let err = CombinedBinary::new("c", IndicatorParams::new())
            .apply(&mut series)
            .unwrap_err();
        assert_eq!(err.to_string(), "CombinedBinary requires key = field_names");
    }
}

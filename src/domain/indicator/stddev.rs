//! Trailing Standard Deviation.
//!
//! Sample standard deviation over the last n values of a source column.
//! STDDEV(n)[i] = sqrt(sum((x[i-j] - mean)^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) positions are `None`; any window holding a missing
//! value is `None`; n = 1 is always `None`.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::indicator::{Indicator, IndicatorParam, IndicatorParams};

pub fn calculate_stddev(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period < 2 || i + 1 < period {
                return None;
            }
            let window: Option<Vec<f64>> = values[i + 1 - period..=i].iter().copied().collect();
            let window = window?;

            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|x| {
                    let diff = x - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;

            Some(variance.sqrt())
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct StdDevTrailing {
    field_name: String,
    params: IndicatorParams,
}

impl StdDevTrailing {
    pub fn new(field_name: &str, params: IndicatorParams) -> Self {
        Self {
            field_name: field_name.to_string(),
            params,
        }
    }
}

impl Indicator for StdDevTrailing {
    fn name(&self) -> &'static str {
        "StdDeviationTrailing"
    }

    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn params(&self) -> &IndicatorParams {
        &self.params
    }

    fn required_params(&self) -> &'static [IndicatorParam] {
        &[IndicatorParam::TrailingBars, IndicatorParam::SourceField]
    }

    fn apply(&self, series: &mut BarSeries) -> Result<(), ScannerError> {
        self.validate()?;
        let trailing = self.params.period(self.name(), IndicatorParam::TrailingBars)?;
        let source = self.params.field(self.name(), IndicatorParam::SourceField)?;

        let values = series.source_values(source)?;
        series.insert_values(&self.field_name, calculate_stddev(&values, trailing));
        Ok(())
    }
}

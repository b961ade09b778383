//! Trailing Volume Weighted Average Price.
//!
//! VWAP(n)[i] = sum(TP[j] * V[j]) / sum(V[j]) for j in i-n+1..=i, where
//! TP = (H + L + C) / 3. Warmup: first (n-1) positions are `None`, as is any
//! window with zero volume.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::indicator::{Indicator, IndicatorParam, IndicatorParams};
use crate::domain::ohlcv::Bar;

pub fn calculate_vwap(bars: &[Bar], trailing_bars: usize) -> Vec<Option<f64>> {
    if trailing_bars == 0 {
        return vec![None; bars.len()];
    }

    (0..bars.len())
        .map(|i| {
            if i + 1 < trailing_bars {
                return None;
            }
            let window = &bars[i + 1 - trailing_bars..=i];
            let volume: f64 = window.iter().map(|b| b.volume as f64).sum();
            if volume == 0.0 {
                return None;
            }
            let weighted: f64 = window
                .iter()
                .map(|b| b.typical_price() * b.volume as f64)
                .sum();
            Some(weighted / volume)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct VwapTrailing {
    field_name: String,
    params: IndicatorParams,
}

impl VwapTrailing {
    pub fn new(field_name: &str, params: IndicatorParams) -> Self {
        Self {
            field_name: field_name.to_string(),
            params,
        }
    }
}

impl Indicator for VwapTrailing {
    fn name(&self) -> &'static str {
        "VWAPTrailing"
    }

    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn params(&self) -> &IndicatorParams {
        &self.params
    }

    fn required_params(&self) -> &'static [IndicatorParam] {
        &[IndicatorParam::TrailingBars]
    }

    fn apply(&self, series: &mut BarSeries) -> Result<(), ScannerError> {
        self.validate()?;
        let trailing = self.params.period(self.name(), IndicatorParam::TrailingBars)?;
        let values = calculate_vwap(&series.bars, trailing);
        series.insert_values(&self.field_name, values);
        Ok(())
    }
}

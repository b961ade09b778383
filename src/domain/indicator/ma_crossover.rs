//! Moving-average crossover signals.
//!
//! Writes `crossover(fast - slow, 0)` to the output field, plus the two
//! averages as `<field>_fast` and `<field>_slow`.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::indicator::crossover::crossover;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{Indicator, IndicatorParam, IndicatorParams};

const REQUIRED: &[IndicatorParam] = &[IndicatorParam::FastPeriod, IndicatorParam::SlowPeriod];

type AverageFn = fn(&[f64], usize) -> Vec<Option<f64>>;

fn apply_ma_crossover(
    indicator: &dyn Indicator,
    series: &mut BarSeries,
    average: AverageFn,
) -> Result<(), ScannerError> {
    indicator.validate()?;
    let params = indicator.params();
    let fast_period = params.period(indicator.name(), IndicatorParam::FastPeriod)?;
    let slow_period = params.period(indicator.name(), IndicatorParam::SlowPeriod)?;

    let closes = series.closes();
    let fast = average(&closes, fast_period);
    let slow = average(&closes, slow_period);

    let spread: Vec<Option<f64>> = fast
        .iter()
        .zip(slow.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let field = indicator.field_name();
    series.insert_values(&format!("{field}_fast"), fast);
    series.insert_values(&format!("{field}_slow"), slow);
    series.insert_signal(field, crossover(&spread, 0.0));
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SmaCrossover {
    field_name: String,
    params: IndicatorParams,
}

impl SmaCrossover {
    pub fn new(field_name: &str, params: IndicatorParams) -> Self {
        Self {
            field_name: field_name.to_string(),
            params,
        }
    }
}

impl Indicator for SmaCrossover {
    fn name(&self) -> &'static str {
        "IndicatorSmaCrossover"
    }

    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn params(&self) -> &IndicatorParams {
        &self.params
    }

    fn required_params(&self) -> &'static [IndicatorParam] {
        REQUIRED
    }

    fn apply(&self, series: &mut BarSeries) -> Result<(), ScannerError> {
        apply_ma_crossover(self, series, calculate_sma)
    }
}

#[derive(Debug, Clone)]
pub struct EmaCrossover {
    field_name: String,
    params: IndicatorParams,
}

impl EmaCrossover {
    pub fn new(field_name: &str, params: IndicatorParams) -> Self {
        Self {
            field_name: field_name.to_string(),
            params,
        }
    }
}

impl Indicator for EmaCrossover {
    fn name(&self) -> &'static str {
        "IndicatorEmaCrossover"
    }

    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn params(&self) -> &IndicatorParams {
        &self.params
    }

    fn required_params(&self) -> &'static [IndicatorParam] {
        REQUIRED
    }

    fn apply(&self, series: &mut BarSeries) -> Result<(), ScannerError> {
        apply_ma_crossover(self, series, calculate_ema)
    }
}

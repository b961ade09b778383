//! Cumulative sum exit filter.
//!
//! Every nonzero signal opens an independent simulated trade at that bar's
//! close. The trade is scanned forward bar by bar and closes on the first of:
//! - `diff >= win_points` (Won),
//! - `diff <= -loss_points` (Lost),
//! - the `threshold_intervals`-th bar, or the end of the series (MaxTime),
//!
//! where `diff = (close[q] - close[entry]) * direction`. Win is checked before
//! loss. Trades never block each other; two trades resolving on the same bar
//! both report an outcome, and the later one owns the result cell.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::filter::{
    Direction, ExitReason, Filter, FilterParam, FilterParams, TradeOutcome,
};
use crate::domain::ohlcv::Bar;
use tracing::debug;

const COMPONENT: &str = "filter_cumsum";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumsumConfig {
    pub win_points: f64,
    pub loss_points: f64,
    pub threshold_intervals: usize,
    /// +1 trades the signal as given, -1 trades its mirror image.
    pub inverse: i8,
}

impl CumsumConfig {
    pub fn from_params(params: &FilterParams, inverse: i8) -> Result<Self, ScannerError> {
        params.ensure_required(COMPONENT, &FilterParam::ALL)?;

        let win_points = positive(params, FilterParam::WinPoints)?;
        let loss_points = positive(params, FilterParam::LossPoints)?;
        let threshold = positive(params, FilterParam::ThresholdIntervals)?;
        if threshold.fract() != 0.0 {
            return Err(invalid(
                FilterParam::ThresholdIntervals.as_str(),
                "must be a whole number of bars",
            ));
        }
        if inverse != 1 && inverse != -1 {
            return Err(invalid("inverse", "must be 1 or -1"));
        }

        Ok(Self {
            win_points,
            loss_points,
            threshold_intervals: threshold as usize,
            inverse,
        })
    }
}

fn positive(params: &FilterParams, key: FilterParam) -> Result<f64, ScannerError> {
    match params.get(key) {
        None => Err(ScannerError::configuration(COMPONENT, key)),
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(_) => Err(invalid(key.as_str(), "must be positive")),
    }
}

fn invalid(key: &str, reason: &str) -> ScannerError {
    ScannerError::ConfigInvalid {
        section: COMPONENT.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Runs the exit search for every nonzero entry in `signal`.
pub fn simulate(bars: &[Bar], signal: &[i8], config: &CumsumConfig) -> Vec<TradeOutcome> {
    signal
        .iter()
        .enumerate()
        .take(bars.len())
        .filter_map(|(index, &raw)| {
            let direction = Direction::from_sign(raw.saturating_mul(config.inverse))?;
            debug!(
                action = ?direction,
                ts = %bars[index].ts,
                close = bars[index].close,
                "entry"
            );
            Some(resolve_exit(bars, index, direction, config))
        })
        .collect()
}

fn resolve_exit(
    bars: &[Bar],
    entry_index: usize,
    direction: Direction,
    config: &CumsumConfig,
) -> TradeOutcome {
    let entry = &bars[entry_index];
    let last = bars.len() - 1;
    let horizon = config.threshold_intervals.max(1);
    let diff_at = |q: usize| (bars[q].close - entry.close) * direction.sign();

    let mut offset = 0;
    let (exit_index, diff, reason) = loop {
        let q = entry_index + offset;
        if q > last {
            break (last, diff_at(last), ExitReason::MaxTime);
        }

        let diff = diff_at(q);
        if diff >= config.win_points {
            break (q, diff, ExitReason::Won);
        }
        if diff <= -config.loss_points {
            break (q, diff, ExitReason::Lost);
        }
        if offset + 1 == horizon {
            break (q, diff, ExitReason::MaxTime);
        }
        offset += 1;
    };

    debug!(
        action = %reason,
        ts = %bars[exit_index].ts,
        diff,
        close = bars[exit_index].close,
        "exit"
    );

    TradeOutcome {
        entry_index,
        exit_index,
        entry_ts: entry.ts,
        exit_ts: bars[exit_index].ts,
        direction,
        diff,
        reason,
    }
}

#[derive(Debug, Clone)]
pub struct CumsumFilter {
    field_name: String,
    result_field_name: String,
    params: FilterParams,
    inverse: i8,
}

impl CumsumFilter {
    pub fn new(field_name: &str, result_field_name: &str, params: FilterParams) -> Self {
        Self {
            field_name: field_name.to_string(),
            result_field_name: result_field_name.to_string(),
            params,
            inverse: 1,
        }
    }

    /// Trades every signal in the opposite direction.
    pub fn inverse(mut self) -> Self {
        self.inverse = -self.inverse;
        self
    }

    pub fn config(&self) -> Result<CumsumConfig, ScannerError> {
        CumsumConfig::from_params(&self.params, self.inverse)
    }
}

impl Filter for CumsumFilter {
    fn name(&self) -> &'static str {
        COMPONENT
    }

    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn result_field_name(&self) -> &str {
        &self.result_field_name
    }

    fn apply(&self, series: &mut BarSeries) -> Result<Vec<TradeOutcome>, ScannerError> {
        let config = self.config()?;
        let signal = series.signal(&self.field_name)?;
        let outcomes = simulate(&series.bars, signal, &config);

        let mut results = vec![None; series.len()];
        for outcome in &outcomes {
            results[outcome.exit_index] = Some(outcome.diff);
        }
        series.insert_values(&self.result_field_name, results);

        Ok(outcomes)
    }
}

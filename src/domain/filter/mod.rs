//! Trade-exit filters.
//!
//! A filter consumes a signal column and writes a realized price difference
//! per simulated trade into a result column.

pub mod cumsum;

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use cumsum::{CumsumConfig, CumsumFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterParam {
    WinPoints,
    LossPoints,
    ThresholdIntervals,
}

impl FilterParam {
    pub const ALL: [FilterParam; 3] = [
        FilterParam::WinPoints,
        FilterParam::LossPoints,
        FilterParam::ThresholdIntervals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterParam::WinPoints => "win_points",
            FilterParam::LossPoints => "loss_points",
            FilterParam::ThresholdIntervals => "threshold_intervals",
        }
    }
}

impl fmt::Display for FilterParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterParam::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unrecognized filter option '{s}'"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    values: BTreeMap<FilterParam, f64>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: FilterParam, value: impl Into<f64>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: FilterParam) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn ensure_required(
        &self,
        component: &str,
        required: &[FilterParam],
    ) -> Result<(), ScannerError> {
        match required.iter().find(|k| !self.values.contains_key(*k)) {
            Some(key) => Err(ScannerError::configuration(component, key)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction of a nonzero signed signal.
    pub fn from_sign(sign: i8) -> Option<Self> {
        match sign.signum() {
            1 => Some(Direction::Long),
            -1 => Some(Direction::Short),
            _ => None,
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Won,
    Lost,
    MaxTime,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Won => "Won",
            ExitReason::Lost => "Lost",
            ExitReason::MaxTime => "MaxTime",
        };
        f.write_str(s)
    }
}

/// One simulated trade, from entry signal to exit.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_ts: DateTime<Utc>,
    pub exit_ts: DateTime<Utc>,
    pub direction: Direction,
    pub diff: f64,
    pub reason: ExitReason,
}

pub trait Filter {
    fn name(&self) -> &'static str;

    /// Signal column the filter reads entries from.
    fn field_name(&self) -> &str;

    /// Column the realized differences are written to.
    fn result_field_name(&self) -> &str;

    fn apply(&self, series: &mut BarSeries) -> Result<Vec<TradeOutcome>, ScannerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_param_names_round_trip() {
        for p in FilterParam::ALL {
            assert_eq!(p.as_str().parse::<FilterParam>().unwrap(), p);
        }
        assert!("stop_points".parse::<FilterParam>().is_err());
    }

    #[test]
    fn ensure_required_reports_missing_threshold() {
        let params = FilterParams::new()
            .with(FilterParam::WinPoints, 20.0)
            .with(FilterParam::LossPoints, 10.0);
        let err = params
            .ensure_required("filter_cumsum", &FilterParam::ALL)
            .unwrap_err();
        assert!(
            matches!(err, ScannerError::Configuration { key, .. } if key == "threshold_intervals")
        );
    }

    #[test]
    fn direction_from_sign() {
        assert_eq!(Direction::from_sign(1), Some(Direction::Long));
        assert_eq!(Direction::from_sign(-1), Some(Direction::Short));
        assert_eq!(Direction::from_sign(0), None);
    }
}

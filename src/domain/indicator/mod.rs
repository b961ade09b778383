//! Technical indicator implementations.
//!
//! This module provides:
//! - `IndicatorParam`: the closed set of option keys an indicator accepts
//! - `ParamValue` / `IndicatorParams`: typed option values keyed by `IndicatorParam`
//! - `Indicator`: the trait every indicator implements (`apply` adds a column)
//! - `IndicatorKind`: indicator identity used for configuration-driven construction

pub mod combined;
pub mod crossover;
pub mod ema;
pub mod ma_crossover;
pub mod sma;
pub mod stddev;
pub mod vwap;

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use combined::CombinedBinary;
pub use crossover::crossover;
pub use ma_crossover::{EmaCrossover, SmaCrossover};
pub use stddev::StdDevTrailing;
pub use vwap::VwapTrailing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndicatorParam {
    FastPeriod,
    SlowPeriod,
    TrailingBars,
    SourceField,
    FieldNames,
}

impl IndicatorParam {
    pub const ALL: [IndicatorParam; 5] = [
        IndicatorParam::FastPeriod,
        IndicatorParam::SlowPeriod,
        IndicatorParam::TrailingBars,
        IndicatorParam::SourceField,
        IndicatorParam::FieldNames,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorParam::FastPeriod => "fast_period",
            IndicatorParam::SlowPeriod => "slow_period",
            IndicatorParam::TrailingBars => "trailing_bars",
            IndicatorParam::SourceField => "source_field",
            IndicatorParam::FieldNames => "field_names",
        }
    }
}

impl fmt::Display for IndicatorParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorParam::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unrecognized indicator option '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Period(usize),
    Field(String),
    Fields(Vec<String>),
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Period(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Field(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Field(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Fields(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        ParamValue::Fields(v.into_iter().map(str::to_string).collect())
    }
}

/// Immutable option set for one indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorParams {
    values: BTreeMap<IndicatorParam, ParamValue>,
}

impl IndicatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: IndicatorParam, value: impl Into<ParamValue>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: IndicatorParam) -> Option<&ParamValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: IndicatorParam) -> bool {
        self.values.contains_key(&key)
    }

    pub fn ensure_required(
        &self,
        component: &str,
        required: &[IndicatorParam],
    ) -> Result<(), ScannerError> {
        match required.iter().find(|k| !self.contains(**k)) {
            Some(key) => Err(ScannerError::configuration(component, key)),
            None => Ok(()),
        }
    }

    pub fn period(&self, component: &str, key: IndicatorParam) -> Result<usize, ScannerError> {
        match self.get(key) {
            None => Err(ScannerError::configuration(component, key)),
            Some(ParamValue::Period(0)) => Err(invalid(component, key, "must be positive")),
            Some(ParamValue::Period(n)) => Ok(*n),
            Some(_) => Err(invalid(component, key, "expected a bar count")),
        }
    }

    pub fn field(&self, component: &str, key: IndicatorParam) -> Result<&str, ScannerError> {
        match self.get(key) {
            None => Err(ScannerError::configuration(component, key)),
            Some(ParamValue::Field(name)) => Ok(name),
            Some(_) => Err(invalid(component, key, "expected a field name")),
        }
    }

    pub fn fields(&self, component: &str, key: IndicatorParam) -> Result<&[String], ScannerError> {
        match self.get(key) {
            None => Err(ScannerError::configuration(component, key)),
            Some(ParamValue::Fields(names)) if names.is_empty() => {
                Err(invalid(component, key, "expected at least one field name"))
            }
            Some(ParamValue::Fields(names)) => Ok(names),
            Some(ParamValue::Field(name)) => Ok(std::slice::from_ref(name)),
            Some(_) => Err(invalid(component, key, "expected a list of field names")),
        }
    }
}

fn invalid(component: &str, key: IndicatorParam, reason: &str) -> ScannerError {
    ScannerError::ConfigInvalid {
        section: component.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// A stateless transform that adds one named column to a bar series.
pub trait Indicator {
    /// Component name used in configuration errors.
    fn name(&self) -> &'static str;

    /// Output column name.
    fn field_name(&self) -> &str;

    fn params(&self) -> &IndicatorParams;

    fn required_params(&self) -> &'static [IndicatorParam];

    /// Fails with `ScannerError::Configuration` naming the first absent key.
    fn validate(&self) -> Result<(), ScannerError> {
        self.params()
            .ensure_required(self.name(), self.required_params())
    }

    fn apply(&self, series: &mut BarSeries) -> Result<(), ScannerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    SmaCrossover,
    EmaCrossover,
    VwapTrailing,
    StdDevTrailing,
    CombinedBinary,
}

impl IndicatorKind {
    pub fn build(
        self,
        field_name: &str,
        params: IndicatorParams,
    ) -> Box<dyn Indicator + Send + Sync> {
        match self {
            IndicatorKind::SmaCrossover => Box::new(SmaCrossover::new(field_name, params)),
            IndicatorKind::EmaCrossover => Box::new(EmaCrossover::new(field_name, params)),
            IndicatorKind::VwapTrailing => Box::new(VwapTrailing::new(field_name, params)),
            IndicatorKind::StdDevTrailing => Box::new(StdDevTrailing::new(field_name, params)),
            IndicatorKind::CombinedBinary => Box::new(CombinedBinary::new(field_name, params)),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndicatorKind::SmaCrossover => "sma_crossover",
            IndicatorKind::EmaCrossover => "ema_crossover",
            IndicatorKind::VwapTrailing => "vwap_trailing",
            IndicatorKind::StdDevTrailing => "stddev_trailing",
            IndicatorKind::CombinedBinary => "combined_binary",
        };
        f.write_str(s)
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma_crossover" => Ok(IndicatorKind::SmaCrossover),
            "ema_crossover" => Ok(IndicatorKind::EmaCrossover),
            "vwap_trailing" => Ok(IndicatorKind::VwapTrailing),
            "stddev_trailing" => Ok(IndicatorKind::StdDevTrailing),
            "combined_binary" => Ok(IndicatorKind::CombinedBinary),
            other => Err(format!("unknown indicator kind '{other}'")),
        }
    }
}

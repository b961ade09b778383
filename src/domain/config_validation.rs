//! Configuration loading and validation.
//!
//! Turns INI sections into typed run settings before any data is touched.

use crate::domain::error::ScannerError;
use crate::domain::experiment::Window;
use crate::domain::filter::{FilterParam, FilterParams};
use crate::domain::indicator::{IndicatorKind, IndicatorParam, IndicatorParams, ParamValue};
use crate::domain::loader::LoadOptions;
use crate::ports::config_port::ConfigPort;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::ops::Range;

pub const DEFAULT_TIMEZONE: &str = "US/Eastern";
pub const DEFAULT_FAST_PERIOD: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub symbol: String,
    pub load: LoadOptions,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub section: String,
    pub kind: IndicatorKind,
    pub field_name: String,
    pub params: IndicatorParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Keys absent from the file stay absent here; the filter reports them.
    pub params: FilterParams,
    pub inverse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub train: Window,
    pub test: Window,
    pub fast_period: usize,
    pub slow_periods: Range<usize>,
    pub parallel: bool,
}

/// Checks every section a scan or sweep reads.
pub fn validate_scan_config(config: &dyn ConfigPort) -> Result<(), ScannerError> {
    scan_config(config)?;
    indicator_configs(config)?;
    filter_config(config)?;
    if !config.keys("sweep").is_empty() {
        sweep_config(config)?;
    }
    Ok(())
}

pub fn scan_config(config: &dyn ConfigPort) -> Result<ScanConfig, ScannerError> {
    let symbol = required(config, "scan", "symbol")?;
    let start = parse_date(config, "scan", "start_date")?;
    let end = parse_date(config, "scan", "end_date")?;
    if start > end {
        return Err(invalid("scan", "start_date", "start_date must not be after end_date"));
    }

    let interval = config.get_int("scan", "interval_minutes", 1);
    if !(1..1440).contains(&interval) {
        return Err(invalid(
            "scan",
            "interval_minutes",
            "interval_minutes must be between 1 and 1439",
        ));
    }

    let tz_name = config
        .get_string("scan", "timezone")
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone: Tz = tz_name
        .trim()
        .parse()
        .map_err(|e| invalid("scan", "timezone", &format!("{e}")))?;

    Ok(ScanConfig {
        symbol,
        load: LoadOptions {
            start,
            end,
            use_rth: config.get_bool("scan", "use_rth", false),
            interval_minutes: interval as u32,
        },
        timezone,
    })
}

/// Indicator sections in application order: the `[scan] indicators` list
/// when present, otherwise the single `[indicator]` section.
pub fn indicator_configs(config: &dyn ConfigPort) -> Result<Vec<IndicatorConfig>, ScannerError> {
    let sections: Vec<String> = match config.get_string("scan", "indicators") {
        Some(list) => split_list(&list),
        None => vec!["indicator".to_string()],
    };
    if sections.is_empty() {
        return Err(invalid("scan", "indicators", "indicators must name at least one section"));
    }

    sections
        .iter()
        .map(|section| indicator_config(config, section))
        .collect()
}

pub fn indicator_config(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<IndicatorConfig, ScannerError> {
    let kind: IndicatorKind = required(config, section, "kind")?
        .parse()
        .map_err(|e: String| invalid(section, "kind", &e))?;
    let field_name = required(config, section, "field_name")?;

    let mut params = IndicatorParams::new();
    for key in config.keys(section) {
        if key == "kind" || key == "field_name" {
            continue;
        }
        let param: IndicatorParam = key.parse().map_err(|e: String| invalid(section, &key, &e))?;
        let Some(raw) = config.get_string(section, &key) else {
            continue;
        };
        params = params.with(param, parse_param(section, param, &raw)?);
    }

    Ok(IndicatorConfig {
        section: section.to_string(),
        kind,
        field_name,
        params,
    })
}

fn parse_param(section: &str, param: IndicatorParam, raw: &str) -> Result<ParamValue, ScannerError> {
    match param {
        IndicatorParam::FastPeriod | IndicatorParam::SlowPeriod | IndicatorParam::TrailingBars => {
            raw.trim()
                .parse::<usize>()
                .map(ParamValue::Period)
                .map_err(|_| invalid(section, param.as_str(), "expected a whole number of bars"))
        }
        IndicatorParam::SourceField => Ok(ParamValue::Field(raw.trim().to_string())),
        IndicatorParam::FieldNames => Ok(ParamValue::Fields(split_list(raw))),
    }
}

pub fn filter_config(config: &dyn ConfigPort) -> Result<FilterConfig, ScannerError> {
    let mut params = FilterParams::new();
    for key in config.keys("filter") {
        if key == "inverse" {
            continue;
        }
        let param: FilterParam = key.parse().map_err(|e: String| invalid("filter", &key, &e))?;
        let Some(raw) = config.get_string("filter", &key) else {
            continue;
        };
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| invalid("filter", &key, "expected a number"))?;
        params = params.with(param, value);
    }

    Ok(FilterConfig {
        params,
        inverse: config.get_bool("filter", "inverse", false),
    })
}

pub fn sweep_config(config: &dyn ConfigPort) -> Result<SweepConfig, ScannerError> {
    let train = parse_window(config, "train_start", "train_end")?;
    let test = parse_window(config, "test_start", "test_end")?;

    let fast_period = config.get_int("sweep", "fast_period", DEFAULT_FAST_PERIOD);
    if fast_period < 1 {
        return Err(invalid("sweep", "fast_period", "fast_period must be at least 1"));
    }

    let min_slow = required_int(config, "sweep", "min_slow_period")?;
    let max_slow = required_int(config, "sweep", "max_slow_period")?;
    if min_slow < 1 {
        return Err(invalid("sweep", "min_slow_period", "min_slow_period must be at least 1"));
    }
    if max_slow <= min_slow {
        return Err(invalid(
            "sweep",
            "max_slow_period",
            "max_slow_period must be greater than min_slow_period",
        ));
    }

    Ok(SweepConfig {
        train,
        test,
        fast_period: fast_period as usize,
        slow_periods: min_slow as usize..max_slow as usize,
        parallel: config.get_bool("sweep", "parallel", true),
    })
}

fn parse_window(
    config: &dyn ConfigPort,
    start_key: &str,
    end_key: &str,
) -> Result<Window, ScannerError> {
    let start = parse_date(config, "sweep", start_key)?;
    let end = parse_date(config, "sweep", end_key)?;
    if start > end {
        return Err(invalid(
            "sweep",
            start_key,
            &format!("{start_key} must not be after {end_key}"),
        ));
    }
    Ok(Window {
        start: start_of_day(start),
        end: end_of_day(end),
    })
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + chrono::Duration::days(1) - chrono::Duration::seconds(1)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, ScannerError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ScannerError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn required_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<i64, ScannerError> {
    required(config, section, key)?
        .parse()
        .map_err(|_| invalid(section, key, "expected an integer"))
}

fn parse_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveDate, ScannerError> {
    let value = required(config, section, key)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        invalid(
            section,
            key,
            &format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn invalid(section: &str, key: &str, reason: &str) -> ScannerError {
    ScannerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

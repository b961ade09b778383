//! Fetch, cache and resample bars for a date range.

use crate::domain::aggregate::aggregate;
use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::BarStore;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Keep only bars flagged as regular trading hours.
    pub use_rth: bool,
    pub interval_minutes: u32,
}

/// Pulls every day from `provider`, stores it in `store` and returns the
/// resampled series. Days without data are skipped. Bars already cached are
/// left as they are.
pub fn load_and_cache(
    provider: &dyn DataPort,
    store: &dyn BarStore,
    symbol: &str,
    options: &LoadOptions,
) -> Result<BarSeries, ScannerError> {
    info!(
        symbol,
        start = %options.start,
        end = %options.end,
        interval = options.interval_minutes,
        "loading bars"
    );

    let mut days = Vec::new();
    for day in options.start.iter_days().take_while(|d| *d <= options.end) {
        let bars = provider.fetch_day(symbol, day)?;
        if bars.is_empty() {
            warn!(symbol, %day, "no data for day, skipping");
            continue;
        }

        let written = store.insert_bars(symbol, &bars)?;
        debug!(symbol, %day, fetched = bars.len(), written, "cached day");
        days.push(bars);
    }

    let series = resample_days(symbol, days, options)?;
    info!(symbol, rows = series.len(), "bars loaded");
    Ok(series)
}

/// Reads the cached bars for a date range without touching the provider.
pub fn query_cached(
    store: &dyn BarStore,
    symbol: &str,
    options: &LoadOptions,
) -> Result<BarSeries, ScannerError> {
    let (start, end) = day_bounds(options.start, options.end);
    let bars = store.fetch_between(symbol, start, end)?;

    let mut days: Vec<Vec<Bar>> = Vec::new();
    for bar in bars {
        match days.last_mut() {
            Some(day) if day[0].ts.date_naive() == bar.ts.date_naive() => day.push(bar),
            _ => days.push(vec![bar]),
        }
    }

    resample_days(symbol, days, options)
}

fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let to = end
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::seconds(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (from, to)
}

fn resample_days(
    symbol: &str,
    days: Vec<Vec<Bar>>,
    options: &LoadOptions,
) -> Result<BarSeries, ScannerError> {
    let mut bars = Vec::new();
    for mut day in days {
        if options.use_rth {
            day.retain(|b| b.rth == Some(true));
        }
        if day.is_empty() {
            continue;
        }
        let resampled = aggregate(&BarSeries::new(symbol, day), options.interval_minutes)?;
        bars.extend(resampled.bars);
    }

    if bars.is_empty() {
        return Err(ScannerError::EmptyInput {
            name: symbol.to_string(),
        });
    }

    bars.sort_by_key(|b| b.ts);
    Ok(BarSeries::new(symbol, bars))
}

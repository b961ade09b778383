//! Resampling of 1-minute bars into coarser sub-daily intervals.
//!
//! Buckets are fixed-width and anchored at midnight (UTC) of the first bar's
//! day. Each bucket is labelled with its start time:
//! open = first, high = max, low = min, close = last, volume = sum.
//! Buckets without bars are dropped.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use chrono::{DateTime, Duration, NaiveTime, Utc};

pub const MINUTES_PER_DAY: u32 = 1440;

pub fn aggregate(series: &BarSeries, interval_minutes: u32) -> Result<BarSeries, ScannerError> {
    if interval_minutes == 1 {
        return Ok(series.clone());
    }
    if interval_minutes == 0 || interval_minutes >= MINUTES_PER_DAY {
        return Err(ScannerError::configuration("aggregate", "interval_minutes"));
    }

    let Some(first) = series.bars.first() else {
        return Ok(BarSeries::new(series.symbol.clone(), Vec::new()));
    };

    let origin = first.ts.date_naive().and_time(NaiveTime::MIN).and_utc();
    let width = i64::from(interval_minutes);

    let mut out: Vec<Bar> = Vec::new();
    let mut current: Option<(i64, Bar)> = None;

    for bar in &series.bars {
        let bucket = (bar.ts - origin).num_minutes().div_euclid(width);
        match current.as_mut() {
            Some((idx, acc)) if *idx == bucket => merge(acc, bar),
            _ => {
                if let Some((_, done)) = current.take() {
                    out.push(done);
                }
                let mut opened = bar.clone();
                opened.ts = bucket_start(origin, bucket, width);
                current = Some((bucket, opened));
            }
        }
    }
    if let Some((_, done)) = current {
        out.push(done);
    }

    Ok(BarSeries::new(series.symbol.clone(), out))
}

fn bucket_start(origin: DateTime<Utc>, bucket: i64, width: i64) -> DateTime<Utc> {
    origin + Duration::minutes(bucket * width)
}

fn merge(acc: &mut Bar, bar: &Bar) {
    acc.high = acc.high.max(bar.high);
    acc.low = acc.low.min(bar.low);
    acc.close = bar.close;
    acc.volume += bar.volume;
    acc.rth = match (acc.rth, bar.rth) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    };
}

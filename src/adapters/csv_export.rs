//! CSV writers for scan and sweep output.
//!
//! Timestamps are rendered in the configured exchange time zone; undefined
//! cells are written empty.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::experiment::SweepResults;
use crate::domain::filter::{Direction, TradeOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use std::path::Path;

fn local(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Bars plus every derived column, one row per bar.
pub fn write_series(path: &Path, series: &BarSeries, tz: Tz) -> Result<(), ScannerError> {
    let mut wtr = csv::Writer::from_path(path)?;
    let names: Vec<&str> = series.column_names().collect();

    let mut header = vec!["ts", "open", "high", "low", "close", "volume", "rth"];
    header.extend(names.iter().copied());
    wtr.write_record(&header)?;

    for (i, bar) in series.bars.iter().enumerate() {
        let mut row = vec![
            local(bar.ts, tz),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.rth.map(|r| r.to_string()).unwrap_or_default(),
        ];
        for name in &names {
            row.push(cell(series.column(name).and_then(|c| c.get(i))));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_trades(path: &Path, outcomes: &[TradeOutcome], tz: Tz) -> Result<(), ScannerError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["entry_ts", "exit_ts", "direction", "bars_held", "diff", "reason"])?;

    for trade in outcomes {
        let direction = match trade.direction {
            Direction::Long => "long",
            Direction::Short => "short",
        };
        wtr.write_record([
            local(trade.entry_ts, tz),
            local(trade.exit_ts, tz),
            direction.to_string(),
            (trade.exit_index - trade.entry_index).to_string(),
            trade.diff.to_string(),
            trade.reason.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_sweep(path: &Path, results: &SweepResults) -> Result<(), ScannerError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "fast_period",
        "slow_period",
        "test_pnl",
        "train_pnl",
        "test_count",
        "train_count",
    ])?;

    for point in &results.points {
        wtr.write_record([
            point.fast_period.to_string(),
            point.slow_period.to_string(),
            point.test.pnl.to_string(),
            point.train.pnl.to_string(),
            point.test.count.to_string(),
            point.train.count.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

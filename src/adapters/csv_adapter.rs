//! CSV file data adapter.
//!
//! One file per symbol under the base directory, `<SYMBOL>.csv`, with a
//! leading `/` of futures symbols dropped (`/MES` reads `MES.csv`). Header:
//! `ts,open,high,low,close,volume[,rth]`, timestamps in RFC 3339.
//!
//! A symbol's file is parsed on its first fetch and kept for the adapter's
//! lifetime, so a multi-day load reads it once.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 6] = ["ts", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
    parsed: RefCell<HashMap<String, Vec<Bar>>>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            parsed: RefCell::new(HashMap::new()),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", symbol.trim_start_matches('/')))
    }

    /// Every bar in the symbol's file, sorted by timestamp.
    pub fn read_all(&self, symbol: &str) -> Result<Vec<Bar>, ScannerError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| ScannerError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut columns = [0usize; 6];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = position(name).ok_or_else(|| ScannerError::DataSource {
                reason: format!("{}: missing {} column", path.display(), name),
            })?;
        }
        let rth_column = position("rth");

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let field = |idx: usize, name: &str| {
                record.get(idx).map(str::trim).ok_or_else(|| ScannerError::DataSource {
                    reason: format!("row {}: missing {} value", line + 1, name),
                })
            };
            let parse_err = |name: &str, e: &dyn std::fmt::Display| ScannerError::DataSource {
                reason: format!("row {}: invalid {} value: {}", line + 1, name, e),
            };

            let ts = DateTime::parse_from_rfc3339(field(columns[0], "ts")?)
                .map_err(|e| parse_err("ts", &e))?
                .with_timezone(&Utc);

            let mut prices = [0.0f64; 4];
            for (k, price) in prices.iter_mut().enumerate() {
                let name = REQUIRED_COLUMNS[k + 1];
                *price = field(columns[k + 1], name)?
                    .parse()
                    .map_err(|e| parse_err(name, &e))?;
            }

            let volume: i64 = field(columns[5], "volume")?
                .parse()
                .map_err(|e| parse_err("volume", &e))?;

            let rth = match rth_column.and_then(|idx| record.get(idx)).map(str::trim) {
                None | Some("") => None,
                Some(v) => Some(parse_flag(v).ok_or_else(|| parse_err("rth", &v))?),
            };

            bars.push(Bar {
                ts,
                open: prices[0],
                high: prices[1],
                low: prices[2],
                close: prices[3],
                volume,
                rth,
            });
        }

        bars.sort_by_key(|b| b.ts);
        Ok(bars)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl DataPort for CsvAdapter {
    fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<Vec<Bar>, ScannerError> {
        if !self.parsed.borrow().contains_key(symbol) {
            let all = self.read_all(symbol)?;
            debug!(symbol, rows = all.len(), "parsed csv file");
            self.parsed.borrow_mut().insert(symbol.to_string(), all);
        }

        let parsed = self.parsed.borrow();
        let all = parsed.get(symbol).map(Vec::as_slice).unwrap_or_default();
        // sorted by ts, so one day is a contiguous run
        let from = all.partition_point(|b| b.ts.date_naive() < day);
        let to = all.partition_point(|b| b.ts.date_naive() <= day);
        let bars = all[from..to].to_vec();

        debug!(symbol, %day, rows = bars.len(), "fetched day from csv");
        Ok(bars)
    }
}

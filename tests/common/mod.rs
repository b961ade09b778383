#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use ta_scanner::domain::bar_series::BarSeries;
use ta_scanner::domain::error::ScannerError;
pub use ta_scanner::domain::ohlcv::Bar;
use ta_scanner::ports::data_port::DataPort;
use ta_scanner::ports::store_port::BarStore;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub calls: RefCell<Vec<NaiveDate>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<Vec<Bar>, ScannerError> {
        self.calls.borrow_mut().push(day);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScannerError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.ts.date_naive() == day)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory cache with the same duplicate rule as the SQL stores.
#[derive(Default)]
pub struct MockBarStore {
    pub rows: RefCell<BTreeMap<(String, DateTime<Utc>), Bar>>,
}

impl BarStore for MockBarStore {
    fn insert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<usize, ScannerError> {
        let mut rows = self.rows.borrow_mut();
        let mut written = 0;
        for bar in bars {
            rows.entry((symbol.to_string(), bar.ts)).or_insert_with(|| {
                written += 1;
                bar.clone()
            });
        }
        Ok(written)
    }

    fn fetch_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScannerError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .filter(|((s, ts), _)| s == symbol && *ts >= start && *ts <= end)
            .map(|(_, bar)| bar.clone())
            .collect())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, ScannerError> {
        let rows = self.rows.borrow();
        let ts: Vec<DateTime<Utc>> = rows
            .keys()
            .filter(|(s, _)| s == symbol)
            .map(|(_, ts)| *ts)
            .collect();
        Ok(match (ts.first(), ts.last()) {
            (Some(first), Some(last)) => Some((*first, *last, ts.len())),
            _ => None,
        })
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScannerError> {
        let mut symbols: Vec<String> = self.rows.borrow().keys().map(|(s, _)| s.clone()).collect();
        symbols.dedup();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn session_start(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 13, 30, 0).unwrap()
}

pub fn make_bar(ts: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        ts,
        open: close,
        high: close + 0.25,
        low: close - 0.25,
        close,
        volume: 100,
        rth: Some(true),
    }
}

/// One bar per minute from `start`, closing at each value in turn.
pub fn minute_bars(start: DateTime<Utc>, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(start + Duration::minutes(i as i64), close))
        .collect()
}

pub fn make_series(symbol: &str, closes: &[f64]) -> BarSeries {
    BarSeries::new(symbol, minute_bars(session_start(2020, 8, 3), closes))
}

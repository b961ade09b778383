//! Bar series with named derived columns.
//!
//! A `BarSeries` owns the ordered bars of one symbol plus any columns that
//! indicators and filters add. Every column is aligned 1:1 with `bars` by
//! position.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Signed event column with values in {-1, 0, +1}.
    Signal(Vec<i8>),
    /// Real-valued column; `None` marks an undefined cell.
    Values(Vec<Option<f64>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Signal(v) => v.len(),
            Column::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `index` widened to `f64`; signal zeros are kept as `Some(0.0)`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Column::Signal(v) => v.get(index).map(|&s| s as f64),
            Column::Values(v) => v.get(index).copied().flatten(),
        }
    }

    fn slice(&self, start: usize, end: usize) -> Column {
        match self {
            Column::Signal(v) => Column::Signal(v[start..end].to_vec()),
            Column::Values(v) => Column::Values(v[start..end].to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
    columns: BTreeMap<String, Column>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn insert_signal(&mut self, name: &str, values: Vec<i8>) {
        debug_assert_eq!(values.len(), self.bars.len());
        self.columns.insert(name.to_string(), Column::Signal(values));
    }

    pub fn insert_values(&mut self, name: &str, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.bars.len());
        self.columns.insert(name.to_string(), Column::Values(values));
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn signal(&self, name: &str) -> Result<&[i8], ScannerError> {
        match self.columns.get(name) {
            Some(Column::Signal(v)) => Ok(v),
            Some(Column::Values(_)) => Err(wrong_kind(name, "signal")),
            None => Err(ScannerError::missing_column(name)),
        }
    }

    pub fn values(&self, name: &str) -> Result<&[Option<f64>], ScannerError> {
        match self.columns.get(name) {
            Some(Column::Values(v)) => Ok(v),
            Some(Column::Signal(_)) => Err(wrong_kind(name, "values")),
            None => Err(ScannerError::missing_column(name)),
        }
    }

    /// Any column by name as optional reals: a derived column first, then the
    /// bar price fields.
    pub fn source_values(&self, name: &str) -> Result<Vec<Option<f64>>, ScannerError> {
        match self.columns.get(name) {
            Some(Column::Values(v)) => Ok(v.clone()),
            Some(Column::Signal(v)) => Ok(v.iter().map(|&s| Some(s as f64)).collect()),
            None if is_price_field(name) => {
                Ok(self.bars.iter().map(|b| b.price_field(name)).collect())
            }
            None => Err(ScannerError::missing_column(name)),
        }
    }

    /// Copy of the bars with `start <= ts <= end`, columns sliced alongside.
    pub fn subset(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        name: &str,
    ) -> Result<BarSeries, ScannerError> {
        let from = self.bars.partition_point(|b| b.ts < start);
        let to = self.bars.partition_point(|b| b.ts <= end);
        if from >= to {
            return Err(ScannerError::EmptyInput {
                name: name.to_string(),
            });
        }

        let columns = self
            .columns
            .iter()
            .map(|(k, c)| (k.clone(), c.slice(from, to)))
            .collect();

        Ok(BarSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[from..to].to_vec(),
            columns,
        })
    }

    /// Drops all derived columns, keeping the bars.
    pub fn without_columns(&self) -> BarSeries {
        BarSeries::new(self.symbol.clone(), self.bars.clone())
    }
}

fn is_price_field(name: &str) -> bool {
    matches!(name, "open" | "high" | "low" | "close" | "volume")
}

fn wrong_kind(field: &str, expected: &'static str) -> ScannerError {
    ScannerError::ColumnType {
        field: field.to_string(),
        expected,
    }
}

//! Core domain types and logic.

pub mod aggregate;
pub mod bar_series;
pub mod config_validation;
pub mod error;
pub mod experiment;
pub mod filter;
pub mod indicator;
pub mod loader;
pub mod ohlcv;
pub mod report;

//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_export;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::bar_series::BarSeries;
use crate::domain::config_validation::{
    FilterConfig, IndicatorConfig, ScanConfig, filter_config, indicator_configs, scan_config,
    sweep_config, validate_scan_config,
};
use crate::domain::error::ScannerError;
use crate::domain::experiment::{RangingExperiment, SweepResults};
use crate::domain::filter::{CumsumFilter, Filter, TradeOutcome};
use crate::domain::indicator::Indicator;
use crate::domain::loader::{LoadOptions, load_and_cache, query_cached};
use crate::domain::report::{ReportSummary, analyze};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::BarStore;

#[derive(Parser, Debug)]
#[command(name = "ta-scanner", about = "Intraday technical-analysis signal scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch bars from the CSV source into the cache
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Show cached data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Run the configured indicators and exit filter, then summarize
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Directory for series.csv and trades.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fetch from the CSV source even when the cache covers the range
        #[arg(long)]
        refresh: bool,
    },
    /// Range the slow SMA period over train and test windows
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fetch from the CSV source even when the cache covers the range
        #[arg(long)]
        refresh: bool,
    },
    /// Validate a scan configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Import {
            config,
            symbol,
            start,
            end,
        } => run_import(&config, symbol.as_deref(), start, end),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::Scan {
            config,
            symbol,
            output,
            refresh,
        } => run_scan(&config, symbol.as_deref(), output.as_deref(), refresh),
        Command::Sweep {
            config,
            output,
            refresh,
        } => run_sweep(&config, output.as_deref(), refresh),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ScannerError> {
    FileConfigAdapter::from_file(path)
}

/// Bar source named by `[data] csv_dir`.
pub fn open_provider(config: &dyn ConfigPort) -> Result<CsvAdapter, ScannerError> {
    let dir = config
        .get_string("data", "csv_dir")
        .ok_or_else(|| ScannerError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir)))
}

/// Bar cache: `[postgres]` when configured and compiled in, else `[sqlite]`.
pub fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn BarStore>, ScannerError> {
    #[cfg(feature = "postgres")]
    {
        use crate::adapters::postgres_adapter::PostgresAdapter;
        if config.get_string("postgres", "connection_string").is_some() {
            return Ok(Box::new(PostgresAdapter::from_config(config)?));
        }
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        Ok(Box::new(SqliteAdapter::from_config(config)?))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
        Err(ScannerError::Database {
            reason: "no bar cache backend compiled in (enable sqlite or postgres)".into(),
        })
    }
}

/// Everything a scan produces.
#[derive(Debug)]
pub struct ScanOutput {
    pub series: BarSeries,
    pub outcomes: Vec<TradeOutcome>,
    pub result_field: String,
    pub summary: ReportSummary,
}

/// Applies the configured indicators in order, then the exit filter on the
/// last indicator's column.
pub fn run_scan_pipeline(
    mut series: BarSeries,
    indicators: &[IndicatorConfig],
    filter: &FilterConfig,
) -> Result<ScanOutput, ScannerError> {
    let mut signal_field = None;
    for cfg in indicators {
        let indicator = cfg.kind.build(&cfg.field_name, cfg.params.clone());
        indicator.apply(&mut series)?;
        info!(indicator = indicator.name(), field = %cfg.field_name, "applied indicator");
        signal_field = Some(cfg.field_name.clone());
    }
    let signal_field = signal_field.ok_or_else(|| ScannerError::ConfigMissing {
        section: "indicator".into(),
        key: "kind".into(),
    })?;

    let result_field = format!("{signal_field}_pnl");
    let mut cumsum = CumsumFilter::new(&signal_field, &result_field, filter.params.clone());
    if filter.inverse {
        cumsum = cumsum.inverse();
    }
    let outcomes = cumsum.apply(&mut series)?;
    info!(trades = outcomes.len(), field = %result_field, "applied exit filter");

    let summary = analyze(&series, &result_field)?;
    Ok(ScanOutput {
        series,
        outcomes,
        result_field,
        summary,
    })
}

fn with_symbol(mut scan: ScanConfig, symbol: Option<&str>) -> ScanConfig {
    if let Some(s) = symbol {
        scan.symbol = s.to_string();
    }
    scan
}

/// Cached bars for the scan range, going to the provider only when the
/// cache holds nothing for it or `refresh` is set.
pub fn load_series(
    provider: &dyn DataPort,
    store: &dyn BarStore,
    scan: &ScanConfig,
    refresh: bool,
) -> Result<BarSeries, ScannerError> {
    if !refresh {
        match query_cached(store, &scan.symbol, &scan.load) {
            Ok(series) => {
                info!(symbol = %scan.symbol, rows = series.len(), "using cached bars");
                return Ok(series);
            }
            Err(ScannerError::EmptyInput { .. }) => {
                info!(symbol = %scan.symbol, "cache empty for range, fetching");
            }
            Err(e) => return Err(e),
        }
    }
    load_and_cache(provider, store, &scan.symbol, &scan.load)
}

fn run_import(
    config_path: &Path,
    symbol: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ScannerError> {
    info!(config = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let mut scan = with_symbol(scan_config(&config)?, symbol);

    // the cache always holds raw minute bars; resampling happens on read
    scan.load = LoadOptions {
        start: start.unwrap_or(scan.load.start),
        end: end.unwrap_or(scan.load.end),
        use_rth: false,
        interval_minutes: 1,
    };

    let provider = open_provider(&config)?;
    let store = open_store(&config)?;
    let series = load_series(&provider, store.as_ref(), &scan, true)?;

    println!(
        "{}: {} bars imported, {} to {}",
        scan.symbol, series.len(), scan.load.start, scan.load.end
    );
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), ScannerError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => store.list_symbols()?,
    };
    if symbols.is_empty() {
        eprintln!("No symbols cached");
    }

    for s in &symbols {
        match store.data_range(s)? {
            Some((first, last, count)) => println!("{s}: {count} bars, {first} to {last}"),
            None => eprintln!("{s}: no data found"),
        }
    }
    Ok(())
}

fn run_scan(
    config_path: &Path,
    symbol: Option<&str>,
    output: Option<&Path>,
    refresh: bool,
) -> Result<(), ScannerError> {
    info!(config = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let scan = with_symbol(scan_config(&config)?, symbol);
    let indicators = indicator_configs(&config)?;
    let filter = filter_config(&config)?;

    let provider = open_provider(&config)?;
    let store = open_store(&config)?;
    let series = load_series(&provider, store.as_ref(), &scan, refresh)?;

    let out = run_scan_pipeline(series, &indicators, &filter)?;

    println!("symbol: {}", scan.symbol);
    println!("bars: {}", out.series.len());
    if out.summary.has_trades() {
        println!("{}", out.summary);
    } else {
        println!("no trades");
    }

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
        csv_export::write_series(&dir.join("series.csv"), &out.series, scan.timezone)?;
        csv_export::write_trades(&dir.join("trades.csv"), &out.outcomes, scan.timezone)?;
        info!(dir = %dir.display(), "wrote scan output");
    }
    Ok(())
}

fn run_sweep(
    config_path: &Path,
    output: Option<&Path>,
    refresh: bool,
) -> Result<(), ScannerError> {
    info!(config = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let scan = scan_config(&config)?;
    let sweep = sweep_config(&config)?;
    let filter = filter_config(&config)?;
    let field_name = config
        .get_string("sweep", "field_name")
        .unwrap_or_else(|| "sma_cross".to_string());

    let provider = open_provider(&config)?;
    let store = open_store(&config)?;
    let series = load_series(&provider, store.as_ref(), &scan, refresh)?;

    let experiment = RangingExperiment {
        field_name,
        train: sweep.train,
        test: sweep.test,
        fast_period: sweep.fast_period,
        slow_periods: sweep.slow_periods,
        filter_params: filter.params,
        parallel: sweep.parallel,
    };
    let results = experiment.run(&series)?;
    print_sweep(&results);

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
        csv_export::write_sweep(&dir.join("sweep.csv"), &results)?;
        info!(dir = %dir.display(), "wrote sweep output");
    }
    Ok(())
}

fn print_sweep(results: &SweepResults) {
    println!(
        "{:>6} {:>6} {:>12} {:>12}",
        "fast", "slow", "train_pnl", "test_pnl"
    );
    for p in &results.points {
        println!(
            "{:>6} {:>6} {:>12.4} {:>12.4}",
            p.fast_period, p.slow_period, p.train.pnl, p.test.pnl
        );
    }
    if let Some(best) = results.best_train() {
        println!("best train: slow={} pnl={:.4}", best.slow_period, best.train.pnl);
    }
    let rank = results.spearman();
    println!(
        "spearman(test, train): {:.4} (p={:.4})",
        rank.corr, rank.pvalue
    );
}

fn run_validate(config_path: &Path) -> Result<(), ScannerError> {
    info!(config = %config_path.display(), "validating config");
    let config = load_config(config_path)?;
    validate_scan_config(&config)?;

    let indicators = indicator_configs(&config)?;
    for cfg in &indicators {
        let indicator = cfg.kind.build(&cfg.field_name, cfg.params.clone());
        indicator.validate()?;
        println!("[{}] {} -> {}", cfg.section, cfg.kind, cfg.field_name);
    }

    let filter = filter_config(&config)?;
    let cumsum = CumsumFilter::new("", "", filter.params);
    cumsum.config()?;

    println!("Configuration is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{FilterParam, FilterParams};
    use crate::domain::indicator::{IndicatorKind, IndicatorParam, IndicatorParams};
    use crate::domain::ohlcv::Bar;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2020, 8, 3, 13, 30, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                ts: start + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1,
                rth: Some(true),
            })
            .collect();
        BarSeries::new("/MES", bars)
    }

    fn sma(fast: usize, slow: usize) -> IndicatorConfig {
        IndicatorConfig {
            section: "indicator".into(),
            kind: IndicatorKind::SmaCrossover,
            field_name: "cross".into(),
            params: IndicatorParams::new()
                .with(IndicatorParam::FastPeriod, fast)
                .with(IndicatorParam::SlowPeriod, slow),
        }
    }

    fn filter(inverse: bool) -> FilterConfig {
        FilterConfig {
            params: FilterParams::new()
                .with(FilterParam::WinPoints, 3.0)
                .with(FilterParam::LossPoints, 3.0)
                .with(FilterParam::ThresholdIntervals, 5),
            inverse,
        }
    }

    #[test]
    fn pipeline_applies_filter_to_last_indicator() {
        let closes = [10.0, 10.0, 10.0, 9.0, 12.0, 14.0, 15.0, 16.0];
        let out = run_scan_pipeline(series(&closes), &[sma(1, 3)], &filter(false)).unwrap();

        // short entry at 3 stopped out at 4, long entry at 4 wins at 6
        assert_eq!(out.result_field, "cross_pnl");
        assert!(out.series.has_column("cross_fast"));
        assert_eq!(out.outcomes.len(), 2);
        assert_eq!(
            out.series.values("cross_pnl").unwrap(),
            &[None, None, None, None, Some(-3.0), None, Some(3.0), None]
        );
        assert_eq!(out.summary.count, 2);
        assert_eq!(out.summary.pnl, 0.0);
    }

    #[test]
    fn inverse_negates_pnl() {
        let closes = [10.0, 10.0, 10.0, 9.0, 12.0, 14.0, 15.0, 16.0];
        let long = run_scan_pipeline(series(&closes), &[sma(1, 3)], &filter(false)).unwrap();
        let short = run_scan_pipeline(series(&closes), &[sma(1, 3)], &filter(true)).unwrap();
        let flipped: Vec<f64> = short.outcomes.iter().map(|o| -o.diff).collect();
        let original: Vec<f64> = long.outcomes.iter().map(|o| o.diff).collect();
        assert_eq!(flipped, original);
    }

    #[test]
    fn pipeline_needs_an_indicator() {
        let err = run_scan_pipeline(series(&[1.0]), &[], &filter(false)).unwrap_err();
        assert!(matches!(err, ScannerError::ConfigMissing { .. }));
    }

    #[test]
    fn cli_parses_scan() {
        let cli = Cli::try_parse_from([
            "ta-scanner",
            "scan",
            "--config",
            "scan.ini",
            "--symbol",
            "/MNQ",
            "--output",
            "out",
        ])
        .unwrap();
        match cli.command {
            Command::Scan {
                config,
                symbol,
                output,
                refresh,
            } => {
                assert_eq!(config, PathBuf::from("scan.ini"));
                assert_eq!(symbol.as_deref(), Some("/MNQ"));
                assert_eq!(output, Some(PathBuf::from("out")));
                assert!(!refresh);
            }
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_import_dates() {
        let cli = Cli::try_parse_from([
            "ta-scanner",
            "import",
            "-c",
            "scan.ini",
            "--start",
            "2020-08-03",
        ])
        .unwrap();
        match cli.command {
            Command::Import { start, end, .. } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2020, 8, 3));
                assert_eq!(end, None);
            }
            other => panic!("expected import, got {other:?}"),
        }
    }
}

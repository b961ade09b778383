//! Train/test parameter ranging over the slow SMA period.
//!
//! Each slow period runs SMA crossover then the cumsum filter on its own
//! copy of the train and test subsets, so points are independent and can run
//! on the rayon pool.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScannerError;
use crate::domain::filter::{CumsumFilter, Filter, FilterParams};
use crate::domain::indicator::{Indicator, IndicatorParam, IndicatorParams, SmaCrossover};
use crate::domain::report::{ReportSummary, analyze};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::ops::Range;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub fast_period: usize,
    pub slow_period: usize,
    pub train: ReportSummary,
    pub test: ReportSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepResults {
    pub points: Vec<SweepPoint>,
}

/// Spearman correlation with its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankCorrelation {
    pub corr: f64,
    pub pvalue: f64,
}

impl SweepResults {
    /// Spearman rank correlation between test and train PnL across points.
    pub fn spearman(&self) -> RankCorrelation {
        let test: Vec<f64> = self.points.iter().map(|p| p.test.pnl).collect();
        let train: Vec<f64> = self.points.iter().map(|p| p.train.pnl).collect();
        let corr = spearman(&test, &train);
        RankCorrelation {
            corr,
            pvalue: spearman_pvalue(corr, test.len()),
        }
    }

    pub fn best_train(&self) -> Option<&SweepPoint> {
        self.points
            .iter()
            .filter(|p| p.train.has_trades())
            .max_by(|a, b| a.train.pnl.total_cmp(&b.train.pnl))
    }
}

#[derive(Debug, Clone)]
pub struct RangingExperiment {
    pub field_name: String,
    pub train: Window,
    pub test: Window,
    pub fast_period: usize,
    pub slow_periods: Range<usize>,
    pub filter_params: FilterParams,
    pub parallel: bool,
}

impl RangingExperiment {
    pub fn result_field_name(&self) -> String {
        format!("{}_pnl", self.field_name)
    }

    pub fn run(&self, series: &BarSeries) -> Result<SweepResults, ScannerError> {
        let base = series.without_columns();
        let train = base.subset(self.train.start, self.train.end, "train_df")?;
        let test = base.subset(self.test.start, self.test.end, "test_df")?;

        info!(
            symbol = %series.symbol,
            train_rows = train.len(),
            test_rows = test.len(),
            slow_periods = ?self.slow_periods,
            parallel = self.parallel,
            "ranging slow period"
        );

        let periods: Vec<usize> = self.slow_periods.clone().collect();
        let points: Vec<SweepPoint> = if self.parallel {
            periods
                .par_iter()
                .map(|&slow| self.run_point(&train, &test, slow))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            periods
                .iter()
                .map(|&slow| self.run_point(&train, &test, slow))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults { points })
    }

    fn run_point(
        &self,
        train: &BarSeries,
        test: &BarSeries,
        slow_period: usize,
    ) -> Result<SweepPoint, ScannerError> {
        let point = SweepPoint {
            fast_period: self.fast_period,
            slow_period,
            train: self.evaluate(train.clone(), slow_period)?,
            test: self.evaluate(test.clone(), slow_period)?,
        };
        debug!(
            slow_period,
            train_pnl = point.train.pnl,
            test_pnl = point.test.pnl,
            "sweep point"
        );
        Ok(point)
    }

    fn evaluate(&self, mut series: BarSeries, slow_period: usize) -> Result<ReportSummary, ScannerError> {
        let indicator = SmaCrossover::new(
            &self.field_name,
            IndicatorParams::new()
                .with(IndicatorParam::FastPeriod, self.fast_period)
                .with(IndicatorParam::SlowPeriod, slow_period),
        );
        indicator.apply(&mut series)?;

        let result_field = self.result_field_name();
        CumsumFilter::new(&self.field_name, &result_field, self.filter_params.clone())
            .apply(&mut series)?;

        analyze(&series, &result_field)
    }
}

/// Average ranks, 1-based; ties share the mean of their positions.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation. `NaN` when fewer than two pairs or either side
/// is constant.
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let ra = ranks(&a[..n]);
    let rb = ranks(&b[..n]);

    let mean = (n as f64 + 1.0) / 2.0;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in ra.iter().zip(&rb) {
        let dx = x - mean;
        let dy = y - mean;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return f64::NAN;
    }
    cov / (var_a * var_b).sqrt()
}

/// Two-sided p-value for a rank correlation over `n` pairs, from the t
/// statistic with `n - 2` degrees of freedom. `NaN` below three pairs.
pub fn spearman_pvalue(corr: f64, n: usize) -> f64 {
    if n < 3 || corr.is_nan() {
        return f64::NAN;
    }
    if corr.abs() >= 1.0 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = corr * (df / (1.0 - corr * corr)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::FilterParam;
    use crate::domain::ohlcv::Bar;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    #[test]
    fn spearman_perfect_and_inverse() {
        assert_relative_eq!(spearman(&[1.0, 2.0, 3.0, 4.0], &[10.0, 20.0, 30.0, 40.0]), 1.0);
        assert_relative_eq!(spearman(&[1.0, 2.0, 3.0], &[9.0, 4.0, 1.0]), -1.0);
    }

    #[test]
    fn spearman_with_ties() {
        // ranks a = [1.5, 1.5, 3], b = [1, 2, 3]
        let rho = spearman(&[5.0, 5.0, 7.0], &[1.0, 2.0, 3.0]);
        assert_relative_eq!(rho, 0.75_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn spearman_pvalue_matches_t_distribution() {
        // rho = 0.8 over 4 pairs: t^2 = 32/9, and for df = 2 the two-sided
        // tail is 1 - t / sqrt(2 + t^2) = 0.2
        let rho = spearman(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]);
        assert_relative_eq!(rho, 0.8, epsilon = 1e-12);
        assert_relative_eq!(spearman_pvalue(rho, 4), 0.2, epsilon = 1e-6);

        assert_eq!(spearman_pvalue(1.0, 5), 0.0);
        assert_relative_eq!(spearman_pvalue(0.0, 10), 1.0, epsilon = 1e-9);
        assert!(spearman_pvalue(0.5, 2).is_nan());
        assert!(spearman_pvalue(f64::NAN, 10).is_nan());
    }

    #[test]
    fn spearman_undefined() {
        assert!(spearman(&[1.0], &[2.0]).is_nan());
        assert!(spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    fn wave_series(n: usize) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2020, 8, 3, 0, 0, 0).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + 10.0 * (i as f64 / 7.0).sin();
                Bar {
                    ts: start + Duration::minutes(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1,
                    rth: Some(true),
                }
            })
            .collect();
        BarSeries::new("/MES", bars)
    }

    fn experiment(series: &BarSeries, parallel: bool) -> RangingExperiment {
        RangingExperiment {
            field_name: "cross".into(),
            train: Window {
                start: series.bars[0].ts,
                end: series.bars[119].ts,
            },
            test: Window {
                start: series.bars[120].ts,
                end: series.bars[199].ts,
            },
            fast_period: 3,
            slow_periods: 5..10,
            filter_params: FilterParams::new()
                .with(FilterParam::WinPoints, 4.0)
                .with(FilterParam::LossPoints, 2.0)
                .with(FilterParam::ThresholdIntervals, 10),
            parallel,
        }
    }

    #[test]
    fn sweep_is_ordered_and_parallel_matches_sequential() {
        let series = wave_series(200);
        let sequential = experiment(&series, false).run(&series).unwrap();
        let parallel = experiment(&series, true).run(&series).unwrap();

        let periods: Vec<usize> = sequential.points.iter().map(|p| p.slow_period).collect();
        assert_eq!(periods, vec![5, 6, 7, 8, 9]);

        let totals = |r: &SweepResults| -> Vec<(f64, usize, f64, usize)> {
            r.points
                .iter()
                .map(|p| (p.train.pnl, p.train.count, p.test.pnl, p.test.count))
                .collect()
        };
        assert_eq!(totals(&sequential), totals(&parallel));
        assert!(sequential.points.iter().any(|p| p.train.has_trades()));
    }

    #[test]
    fn empty_test_window_fails() {
        let series = wave_series(200);
        let mut exp = experiment(&series, false);
        exp.test = Window {
            start: series.bars[199].ts + Duration::days(1),
            end: series.bars[199].ts + Duration::days(2),
        };
        match exp.run(&series) {
            Err(ScannerError::EmptyInput { name }) => assert_eq!(name, "test_df"),
            other => panic!("expected EmptyInput, got {other:?}"),
        }
    }
}

//! Crossover event detection.
//!
//! -1 where the series crosses down through `reference`, +1 where it crosses up.
//! The upward check runs second, so a value resting exactly on the reference
//! classifies as +1. Position 0 and positions next to a missing value yield 0.

pub fn crossover(series: &[Option<f64>], reference: f64) -> Vec<i8> {
    let mut out = vec![0i8; series.len()];

    for i in 1..series.len() {
        let (Some(prev), Some(cur)) = (series[i - 1], series[i]) else {
            continue;
        };
        if cur <= reference && prev >= reference {
            out[i] = -1;
        }
        if cur >= reference && prev <= reference {
            out[i] = 1;
        }
    }

    out
}

//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the first value, then EMA[i] = v[i]*k + EMA[i-1]*(1-k).
//! Defined from the first position on.

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema: Option<f64> = None;

    for &v in values {
        let next = match ema {
            None => v,
            Some(prev) => v * k + prev * (1.0 - k),
        };
        ema = Some(next);
        out.push(ema);
    }

    out
}

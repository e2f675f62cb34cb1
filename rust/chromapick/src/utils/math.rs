//! Small numeric helpers shared by the analyzers.
//!
//! All of these operate on plain slices and return `0.0` (or `NaN` where
//! noted) instead of erroring on degenerate input, callers validate first.

/// Trapezoidal integral of `y` over `x`.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) * 0.5)
        .sum()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    central_moment(values, 2).sqrt()
}

pub fn central_moment(values: &[f64], order: i32) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    values.iter().map(|x| (x - mu).powi(order)).sum::<f64>() / values.len() as f64
}

/// Biased sample skewness, `m3 / m2^1.5`. Zero for constant input.
pub fn skewness(values: &[f64]) -> f64 {
    let m2 = central_moment(values, 2);
    if m2 <= 0.0 {
        return 0.0;
    }
    central_moment(values, 3) / m2.powf(1.5)
}

/// Excess (Fisher) kurtosis. Zero for constant input.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let m2 = central_moment(values, 2);
    if m2 <= 0.0 {
        return 0.0;
    }
    central_moment(values, 4) / (m2 * m2) - 3.0
}

/// Percentile with linear interpolation between closest ranks.
/// `q` is in percent. Returns `NaN` for empty input.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Least-squares slope of `y` against `x`. `NaN` when `x` is constant.
pub fn linear_slope(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx) * (xi - mx);
    }
    if sxx == 0.0 { f64::NAN } else { sxy / sxx }
}

pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

//! Goodness-of-fit statistics.
//!
//! All helpers take the observed values and the residual sum of squares so the
//! fitter can compute them once per model.

/// Floor for `SSres / n` inside the AIC logarithm.
///
/// An exact fit would otherwise yield `-inf`, which is not a portable number.
const AIC_SSE_FLOOR: f64 = 1e-12;

/// Total sum of squares around the mean.
///
/// Returns exactly `0.0` for a constant series, without relying on the mean
/// being representable.
pub fn total_sum_of_squares(y: &[f64]) -> f64 {
    let Some(&first) = y.first() else {
        return 0.0;
    };
    if y.iter().all(|&v| v == first) {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    y.iter().map(|v| (v - mean) * (v - mean)).sum()
}

/// `1 − SSres/SStot`, defined as `0` when `SStot = 0`.
pub fn r_squared(y: &[f64], sse: f64) -> f64 {
    let sst = total_sum_of_squares(y);
    if sst > 0.0 { 1.0 - sse / sst } else { 0.0 }
}

/// Root mean squared residual.
pub fn rmse(n: usize, sse: f64) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    (sse / n as f64).sqrt()
}

/// Akaike information criterion for Gaussian residuals: `n·ln(SSres/n) + 2k`.
pub fn aic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(AIC_SSE_FLOOR);
    n_f * sse_per.ln() + 2.0 * k as f64
}

//! Basis functions for the seasonal-trend model.
//!
//! - Fourier features: `sin(2πk d/P), cos(2πk d/P)` for `k = 1..=order`, where
//!   `d` is days since the series origin and `P` the period in days.
//! - Changepoint hinge: `(t - s)_+`, the contribution of a rate change at `s`
//!   to the trend at scaled time `t`.

use std::f64::consts::PI;

/// Fill `out` (length `2 * order`) with Fourier features at `days`.
///
/// Layout is `[sin_1, cos_1, sin_2, cos_2, ...]`.
pub fn fill_fourier(days: f64, period: f64, order: usize, out: &mut [f64]) {
    debug_assert_eq!(out.len(), 2 * order);
    let base = 2.0 * PI * days / period;
    for k in 0..order {
        let x = base * (k + 1) as f64;
        out[2 * k] = x.sin();
        out[2 * k + 1] = x.cos();
    }
}

/// Evaluate a Fourier series with the given coefficients at `days`.
pub fn fourier_value(days: f64, period: f64, coefficients: &[f64]) -> f64 {
    let order = coefficients.len() / 2;
    let base = 2.0 * PI * days / period;
    let mut v = 0.0;
    for k in 0..order {
        let x = base * (k + 1) as f64;
        v += coefficients[2 * k] * x.sin() + coefficients[2 * k + 1] * x.cos();
    }
    v
}

/// Hinge `(t - s)_+`.
pub fn hinge(t: f64, s: f64) -> f64 {
    if t >= s { t - s } else { 0.0 }
}

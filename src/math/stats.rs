//! Small descriptive statistics helpers.

/// Median of a slice (sorts in place). `None` for an empty slice.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Linear-interpolated quantile of an already sorted slice, `q ∈ [0, 1]`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Robust noise scale from first differences.
///
/// For white noise with std `σ`, differences have std `σ√2`; the MAD of the
/// differences (× 1.4826 for Gaussian consistency) estimates that.
pub fn diff_noise_scale(y: &[f64]) -> f64 {
    if y.len() < 2 {
        return 0.0;
    }
    let mut abs_diffs: Vec<f64> = y.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let mad = median_mut(&mut abs_diffs).unwrap_or(0.0);
    1.4826 * mad / std::f64::consts::SQRT_2
}

/// Round to a fixed number of fractional digits.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let f = 10f64.powi(digits);
    (value * f).round() / f
}

//! Changepoint placement.
//!
//! Automatic placement spreads changepoints evenly over the observation index
//! within the first `changepoint_range` of the history, so the last stretch of
//! data (where a rate change would be poorly identified) has none. Manual
//! placement keeps the requested dates that fall strictly inside the history.

use chrono::NaiveDate;

use crate::domain::ModelOptions;
use crate::error::{ForecastError, Result};

/// Observation indices of automatically placed changepoints.
///
/// Uses `min(n_changepoints, ⌊n·range⌋ - 1)` points at evenly spaced indices
/// over `[0, ⌊n·range⌋ - 1]`, excluding index 0.
pub fn auto_changepoint_indices(n_obs: usize, n_changepoints: usize, range: f64) -> Vec<usize> {
    let hist_size = (n_obs as f64 * range).floor() as usize;
    if hist_size < 2 {
        return Vec::new();
    }
    let n_cp = n_changepoints.min(hist_size - 1);
    if n_cp == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    let mut out: Vec<usize> = (1..=n_cp)
        .map(|i| (last * i as f64 / n_cp as f64).round() as usize)
        .filter(|&idx| idx > 0)
        .collect();
    out.dedup();
    out
}

/// Resolve changepoints as `(date, scaled t)` pairs, sorted by `t`.
pub fn place_changepoints(dates: &[NaiveDate], t: &[f64], opts: &ModelOptions) -> Result<Vec<(NaiveDate, f64)>> {
    if !(opts.changepoint_range.is_finite() && opts.changepoint_range > 0.0 && opts.changepoint_range <= 1.0) {
        return Err(ForecastError::InvalidOption(format!(
            "changepoint_range must be in (0, 1], got {}",
            opts.changepoint_range
        )));
    }

    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return Ok(Vec::new());
    };

    if let Some(manual) = &opts.changepoints {
        let span = (last - first).num_days() as f64;
        let mut out: Vec<(NaiveDate, f64)> = manual
            .iter()
            .filter(|d| **d > first && **d < last)
            .map(|d| (*d, (*d - first).num_days() as f64 / span))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out.dedup_by(|a, b| a.0 == b.0);
        return Ok(out);
    }

    Ok(auto_changepoint_indices(dates.len(), opts.n_changepoints, opts.changepoint_range)
        .into_iter()
        .map(|i| (dates[i], t[i]))
        .collect())
}

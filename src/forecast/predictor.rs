//! Point forecasts and prediction intervals.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::domain::{FittedModel, ForecastOptions, ForecastPoint};
use crate::error::{ForecastError, Result};
use crate::forecast::simulate::{simulate_paths, sorted_noise_draws};
use crate::math::quantile_sorted;
use crate::models::{compose, days_since, holiday_value, seasonal_value};

/// Forecast the historical range plus `horizon_days` days past the cutoff.
///
/// Historical bounds carry residual noise only. Future bounds combine noise
/// with simulated trend changes; their offsets from the point estimate never
/// shrink further out.
pub fn predict(model: &FittedModel, horizon_days: usize, opts: &ForecastOptions) -> Result<Vec<ForecastPoint>> {
    validate_options(opts)?;

    let q_lo = (1.0 - opts.interval_width) / 2.0;
    let q_hi = 1.0 - q_lo;
    let scale = model.y_scale;

    // Noise-only offsets (original units).
    let draws = sorted_noise_draws(opts.uncertainty_samples, opts.seed);
    let noise_lo = (-quantile_sorted(&draws, q_lo).unwrap_or(0.0) * model.sigma * scale).max(0.0);
    let noise_hi = (quantile_sorted(&draws, q_hi).unwrap_or(0.0) * model.sigma * scale).max(0.0);

    let mut out: Vec<ForecastPoint> = model
        .history
        .observations
        .iter()
        .map(|obs| {
            let c = model.components_at(obs.date);
            ForecastPoint {
                date: obs.date,
                point_estimate: c.yhat,
                lower_bound: c.yhat - noise_lo,
                upper_bound: c.yhat + noise_hi,
                trend: c.trend,
                seasonal: c.seasonal,
                holiday: c.holiday,
            }
        })
        .collect();

    if horizon_days == 0 {
        return Ok(out);
    }

    let future_dates: Vec<NaiveDate> = (1..=horizon_days as i64)
        .map(|i| model.last_date + Duration::days(i))
        .collect();
    let future_t: Vec<f64> = future_dates.iter().map(|d| model.scaled_time(*d)).collect();
    // Seasonal and holiday parts are fixed per date; only the trend varies by path.
    let fixed: Vec<(f64, f64)> = future_dates
        .iter()
        .map(|d| {
            (
                seasonal_value(&model.seasonalities, days_since(model.first_date, *d)),
                holiday_value(&model.holidays, *d),
            )
        })
        .collect();

    let mode = model.mode;
    let paths = simulate_paths(
        &model.trend,
        &future_t,
        model.sigma,
        opts.uncertainty_samples,
        opts.seed,
        |i, g| {
            let (s, h) = fixed[i];
            compose(mode, g, s, h)
        },
    );

    let mut off_lo = noise_lo;
    let mut off_hi = noise_hi;
    let mut column = vec![0.0; paths.len()];
    for (i, date) in future_dates.iter().enumerate() {
        let c = model.components_at(*date);
        for (slot, path) in column.iter_mut().zip(&paths) {
            *slot = path[i] * scale;
        }
        column.sort_by(f64::total_cmp);
        let lo = quantile_sorted(&column, q_lo).unwrap_or(c.yhat);
        let hi = quantile_sorted(&column, q_hi).unwrap_or(c.yhat);

        off_lo = off_lo.max(c.yhat - lo);
        off_hi = off_hi.max(hi - c.yhat);

        out.push(ForecastPoint {
            date: *date,
            point_estimate: c.yhat,
            lower_bound: c.yhat - off_lo,
            upper_bound: c.yhat + off_hi,
            trend: c.trend,
            seasonal: c.seasonal,
            holiday: c.holiday,
        });
    }

    debug!(
        group = model.history.label(),
        horizon_days,
        samples = opts.uncertainty_samples,
        final_width = off_lo + off_hi,
        "forecast simulated"
    );
    Ok(out)
}

fn validate_options(opts: &ForecastOptions) -> Result<()> {
    if !(opts.interval_width > 0.0 && opts.interval_width < 1.0) {
        return Err(ForecastError::InvalidOption(format!(
            "interval_width must be in (0, 1), got {}",
            opts.interval_width
        )));
    }
    if opts.uncertainty_samples == 0 {
        return Err(ForecastError::InvalidOption(
            "uncertainty_samples must be >= 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyObservation, ModelOptions, Series};
    use crate::fit::fit;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn noisy_series(days: usize) -> Series {
        let d0 = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 5.0).unwrap();
        Series {
            group: None,
            observations: (0..days)
                .map(|i| {
                    let weekly = 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin();
                    DailyObservation {
                        date: d0 + Duration::days(i as i64),
                        value: 100.0 + 0.1 * i as f64 + weekly + noise.sample(&mut rng),
                        profit: 0.0,
                        quantity: 0.0,
                        group: None,
                    }
                })
                .collect(),
        }
    }

    fn fitted() -> FittedModel {
        fit(&noisy_series(400), &ModelOptions::default()).unwrap()
    }

    #[test]
    fn bounds_bracket_the_point_estimate() {
        let model = fitted();
        let points = predict(&model, 60, &ForecastOptions::default()).unwrap();
        assert_eq!(points.len(), 460);
        for p in &points {
            assert!(p.lower_bound <= p.point_estimate && p.point_estimate <= p.upper_bound, "{p:?}");
        }
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn future_intervals_widen_and_exceed_history() {
        let model = fitted();
        let points = predict(&model, 90, &ForecastOptions::default()).unwrap();
        let cutoff = model.last_date;

        let hist_max = points
            .iter()
            .filter(|p| !p.is_future(cutoff))
            .map(|p| p.width())
            .fold(0.0, f64::max);
        let future: Vec<&ForecastPoint> = points.iter().filter(|p| p.is_future(cutoff)).collect();
        assert_eq!(future.len(), 90);
        assert!(future.windows(2).all(|w| w[1].width() >= w[0].width() - 1e-9));
        assert!(future.iter().all(|p| p.width() >= hist_max - 1e-9));
        assert!(future[89].width() > future[0].width());
    }

    #[test]
    fn zero_horizon_returns_history_only() {
        let model = fitted();
        let points = predict(&model, 0, &ForecastOptions::default()).unwrap();
        assert_eq!(points.len(), model.n_obs);
        assert_eq!(points.last().unwrap().date, model.last_date);
    }

    #[test]
    fn same_seed_same_forecast() {
        let model = fitted();
        let opts = ForecastOptions {
            uncertainty_samples: 200,
            ..ForecastOptions::default()
        };
        let a = predict(&model, 30, &opts).unwrap();
        let b = predict(&model, 30, &opts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_interval_is_rejected() {
        let model = fitted();
        let opts = ForecastOptions {
            interval_width: 1.5,
            ..ForecastOptions::default()
        };
        assert!(matches!(predict(&model, 5, &opts), Err(ForecastError::InvalidOption(_))));
    }
}

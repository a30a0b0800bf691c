//! Fitting the seasonal-trend model to one daily series.
//!
//! Given:
//! - scaled values `y_i = value_i / y_scale`
//! - scaled times `t_i ∈ [0, 1]`
//! - changepoints `s_j`, Fourier blocks and holiday indicators
//!
//! we solve a penalized least squares problem (Gaussian priors on trend rate
//! changes and on seasonal/holiday coefficients) and return the parameters as a
//! plain `FittedModel` value.
//!
//! Additive mode is linear in all parameters: one joint solve. Multiplicative
//! mode (`y = g (1 + s + h)`) is bilinear; we alternate between the trend block
//! and the seasonal/holiday block, each an exact penalized solve given the
//! other, so the objective never increases between iterations.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::{
    Changepoint, FittedModel, HolidayDate, HolidayEffect, ModelOptions, SeasonalComponent, SeasonalityMode, Series,
    TrendParams,
};
use crate::error::{ForecastError, Result};
use crate::fit::changepoints::place_changepoints;
use crate::math::{diff_noise_scale, solve_ridge};
use crate::models::{days_since, fill_seasonal_row, fill_trend_row, holiday_active};

pub const YEARLY_PERIOD: f64 = 365.25;
pub const WEEKLY_PERIOD: f64 = 7.0;

/// A seasonal block needs this many full cycles of history to be separable
/// from the trend.
const MIN_CYCLES: f64 = 2.0;

/// Floor on the pre-fit noise scale (scaled units).
const SIGMA_FLOOR: f64 = 1e-6;

/// Floor on the objective when judging relative convergence.
const OBJECTIVE_FLOOR: f64 = 1e-8;

/// Seasonal/holiday layout resolved for one fit.
#[derive(Debug, Clone)]
struct SeasonalLayout {
    /// `(name, period, order)`
    seasonalities: Vec<(String, f64, usize)>,
    /// `(label, occurrences)`
    holidays: Vec<(String, Vec<HolidayDate>)>,
}

impl SeasonalLayout {
    fn n_fourier(&self) -> usize {
        self.seasonalities.iter().map(|(_, _, o)| 2 * o).sum()
    }

    fn width(&self) -> usize {
        self.n_fourier() + self.holidays.len()
    }
}

/// Penalized solution for one pass.
#[derive(Debug, Clone)]
struct Solution {
    trend: DVector<f64>,
    seasonal: DVector<f64>,
    iterations: usize,
}

/// Fit the seasonal-trend model to `series`.
pub fn fit(series: &Series, opts: &ModelOptions) -> Result<FittedModel> {
    validate_options(opts)?;

    let n = series.len();
    let (Some(first_date), Some(last_date)) = (series.first_date(), series.last_date()) else {
        return Err(ForecastError::EmptySeries {
            group: series.group.clone(),
            distinct_dates: n,
        });
    };
    if n < 2 || first_date == last_date {
        return Err(ForecastError::EmptySeries {
            group: series.group.clone(),
            distinct_dates: n,
        });
    }

    let values = series.values();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::FitDivergence("series contains non-finite values".into()));
    }
    let y_scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if y_scale <= 0.0 {
        return Err(ForecastError::FitDivergence(format!(
            "series '{}' is identically zero; no scale to fit",
            series.label()
        )));
    }

    let dates = series.dates();
    let span_days = days_since(first_date, last_date);
    let days: Vec<f64> = dates.iter().map(|d| days_since(first_date, *d)).collect();
    let t: Vec<f64> = days.iter().map(|d| d / span_days).collect();
    let y = DVector::from_iterator(n, values.iter().map(|v| v / y_scale));

    let changepoints = place_changepoints(&dates, &t, opts)?;
    let cp_ts: Vec<f64> = changepoints.iter().map(|(_, s)| *s).collect();
    let layout = resolve_layout(series, &dates, span_days, opts);

    // Design blocks.
    let p_trend = 2 + cp_ts.len();
    let p_seasonal = layout.width();
    let mut x_trend = DMatrix::<f64>::zeros(n, p_trend);
    let mut x_seasonal = DMatrix::<f64>::zeros(n, p_seasonal);
    let season_terms: Vec<(f64, usize)> = layout.seasonalities.iter().map(|(_, p, o)| (*p, *o)).collect();
    let holiday_terms: Vec<&[HolidayDate]> = layout.holidays.iter().map(|(_, d)| d.as_slice()).collect();
    let mut trend_row = vec![0.0; p_trend];
    let mut seasonal_row = vec![0.0; p_seasonal];
    for i in 0..n {
        fill_trend_row(t[i], &cp_ts, &mut trend_row);
        for (j, v) in trend_row.iter().enumerate() {
            x_trend[(i, j)] = *v;
        }
        if p_seasonal > 0 {
            fill_seasonal_row(dates[i], days[i], &season_terms, &holiday_terms, &mut seasonal_row);
            for (j, v) in seasonal_row.iter().enumerate() {
                x_seasonal[(i, j)] = *v;
            }
        }
    }

    // Gaussian-prior penalties: λ = σ₀² / τ².
    let sigma0 = diff_noise_scale(y.as_slice()).max(SIGMA_FLOOR);
    let var0 = sigma0 * sigma0;
    let lambda_delta = var0 / opts.changepoint_flexibility.powi(2);
    let lambda_season = var0 / opts.seasonality_prior_scale.powi(2);
    let lambda_holiday = var0 / opts.holiday_prior_scale.powi(2);

    let mut trend_pen = vec![0.0, 0.0];
    trend_pen.extend(std::iter::repeat_n(lambda_delta, cp_ts.len()));
    let mut seasonal_pen = vec![lambda_season; layout.n_fourier()];
    seasonal_pen.extend(std::iter::repeat_n(lambda_holiday, layout.holidays.len()));

    debug!(
        group = series.label(),
        n,
        changepoints = cp_ts.len(),
        seasonal_cols = p_seasonal,
        sigma0,
        "fitting seasonal-trend model"
    );

    let solution = match opts.seasonality_mode {
        SeasonalityMode::Additive => solve_additive(&x_trend, &x_seasonal, &y, &trend_pen, &seasonal_pen)?,
        SeasonalityMode::Multiplicative => {
            solve_multiplicative(&x_trend, &x_seasonal, &y, &trend_pen, &seasonal_pen, opts)?
        }
    };

    if solution.trend.iter().chain(solution.seasonal.iter()).any(|v| !v.is_finite()) {
        return Err(ForecastError::FitDivergence("non-finite parameters".into()));
    }

    let fitted = predict_scaled(opts.seasonality_mode, &x_trend, &x_seasonal, &solution);
    let sse: f64 = (&y - &fitted).iter().map(|r| r * r).sum();
    let sigma = (sse / n as f64).sqrt();
    if !sigma.is_finite() {
        return Err(ForecastError::FitDivergence("non-finite residual scale".into()));
    }

    let model = assemble_model(
        series,
        opts.seasonality_mode,
        (first_date, last_date, span_days, y_scale),
        &changepoints,
        &layout,
        &solution,
        sigma,
    );

    debug!(
        group = series.label(),
        sigma = model.sigma,
        iterations = model.iterations,
        "fit complete"
    );
    Ok(model)
}

fn validate_options(opts: &ModelOptions) -> Result<()> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(opts.changepoint_flexibility) {
        return Err(ForecastError::InvalidOption(format!(
            "changepoint_flexibility must be > 0, got {}",
            opts.changepoint_flexibility
        )));
    }
    if !positive(opts.seasonality_prior_scale) || !positive(opts.holiday_prior_scale) {
        return Err(ForecastError::InvalidOption("prior scales must be > 0".into()));
    }
    if !positive(opts.tolerance) || opts.max_iterations == 0 {
        return Err(ForecastError::InvalidOption(
            "tolerance must be > 0 and max_iterations >= 1".into(),
        ));
    }
    Ok(())
}

fn resolve_layout(series: &Series, dates: &[NaiveDate], span_days: f64, opts: &ModelOptions) -> SeasonalLayout {
    let mut seasonalities = Vec::new();

    let mut consider = |enabled: bool, name: &str, period: f64, order: usize| {
        if !enabled || order == 0 {
            return;
        }
        if span_days >= MIN_CYCLES * period {
            seasonalities.push((name.to_string(), period, order));
        } else {
            warn!(
                group = series.label(),
                component = name,
                span_days,
                "history shorter than two cycles; seasonal component dropped"
            );
        }
    };
    consider(opts.yearly_seasonality, "yearly", YEARLY_PERIOD, opts.yearly_order);
    consider(opts.weekly_seasonality, "weekly", WEEKLY_PERIOD, opts.weekly_order);

    if opts.daily_seasonality {
        warn!(
            group = series.label(),
            "daily seasonality requested on a daily series; component dropped"
        );
    }

    // One effect per label, shared by all of its occurrences.
    let mut by_label: BTreeMap<String, Vec<HolidayDate>> = BTreeMap::new();
    for h in &opts.holidays {
        by_label.entry(h.label.clone()).or_default().push(HolidayDate {
            date: h.date,
            window: h.window,
        });
    }
    let holidays = by_label
        .into_iter()
        .filter(|(_, hdates)| dates.iter().any(|d| holiday_active(*d, hdates)))
        .map(|(label, mut hdates)| {
            hdates.sort();
            hdates.dedup();
            (label, hdates)
        })
        .collect();

    SeasonalLayout { seasonalities, holidays }
}

fn solve_additive(
    x_trend: &DMatrix<f64>,
    x_seasonal: &DMatrix<f64>,
    y: &DVector<f64>,
    trend_pen: &[f64],
    seasonal_pen: &[f64],
) -> Result<Solution> {
    let p_t = x_trend.ncols();
    let p_s = x_seasonal.ncols();
    let n = y.len();

    let mut x = DMatrix::<f64>::zeros(n, p_t + p_s);
    x.columns_mut(0, p_t).copy_from(x_trend);
    if p_s > 0 {
        x.columns_mut(p_t, p_s).copy_from(x_seasonal);
    }
    let mut pen = trend_pen.to_vec();
    pen.extend_from_slice(seasonal_pen);

    let beta = solve_ridge(&x, y, &pen)
        .ok_or_else(|| ForecastError::FitDivergence("least squares solve failed".into()))?;

    Ok(Solution {
        trend: beta.rows(0, p_t).into_owned(),
        seasonal: beta.rows(p_t, p_s).into_owned(),
        iterations: 1,
    })
}

fn solve_multiplicative(
    x_trend: &DMatrix<f64>,
    x_seasonal: &DMatrix<f64>,
    y: &DVector<f64>,
    trend_pen: &[f64],
    seasonal_pen: &[f64],
    opts: &ModelOptions,
) -> Result<Solution> {
    let n = y.len();
    let p_s = x_seasonal.ncols();
    let diverged = || ForecastError::FitDivergence("least squares solve failed".into());

    // Start from the trend alone.
    let mut beta_t = solve_ridge(x_trend, y, trend_pen).ok_or_else(diverged)?;
    let mut beta_s = DVector::<f64>::zeros(p_s);
    if p_s == 0 {
        return Ok(Solution {
            trend: beta_t,
            seasonal: beta_s,
            iterations: 1,
        });
    }

    let mut prev = f64::INFINITY;
    for iter in 1..=opts.max_iterations {
        // Seasonal step: y - g = diag(g) X_s β_s.
        let g = x_trend * &beta_t;
        let mut xs = x_seasonal.clone();
        for i in 0..n {
            xs.row_mut(i).scale_mut(g[i]);
        }
        beta_s = solve_ridge(&xs, &(y - &g), seasonal_pen).ok_or_else(diverged)?;

        // Trend step: y = diag(1 + s) X_t β_t.
        let s = x_seasonal * &beta_s;
        let mut xt = x_trend.clone();
        for i in 0..n {
            xt.row_mut(i).scale_mut(1.0 + s[i]);
        }
        beta_t = solve_ridge(&xt, y, trend_pen).ok_or_else(diverged)?;

        let objective = penalized_objective(&xt, &beta_t, y, trend_pen, &beta_s, seasonal_pen);
        if !objective.is_finite() {
            return Err(ForecastError::FitDivergence(format!(
                "objective became non-finite at iteration {iter}"
            )));
        }
        if prev.is_finite() && (prev - objective).abs() <= opts.tolerance * prev.max(OBJECTIVE_FLOOR) {
            return Ok(Solution {
                trend: beta_t,
                seasonal: beta_s,
                iterations: iter,
            });
        }
        prev = objective;
    }

    Err(ForecastError::FitDivergence(format!(
        "alternating solve did not converge within {} iterations",
        opts.max_iterations
    )))
}

fn penalized_objective(
    xt_scaled: &DMatrix<f64>,
    beta_t: &DVector<f64>,
    y: &DVector<f64>,
    trend_pen: &[f64],
    beta_s: &DVector<f64>,
    seasonal_pen: &[f64],
) -> f64 {
    let r = y - xt_scaled * beta_t;
    let sse: f64 = r.iter().map(|v| v * v).sum();
    let pen_t: f64 = beta_t.iter().zip(trend_pen).map(|(b, l)| l * b * b).sum();
    let pen_s: f64 = beta_s.iter().zip(seasonal_pen).map(|(b, l)| l * b * b).sum();
    sse + pen_t + pen_s
}

fn predict_scaled(
    mode: SeasonalityMode,
    x_trend: &DMatrix<f64>,
    x_seasonal: &DMatrix<f64>,
    solution: &Solution,
) -> DVector<f64> {
    let g = x_trend * &solution.trend;
    if x_seasonal.ncols() == 0 {
        return g;
    }
    let s = x_seasonal * &solution.seasonal;
    match mode {
        SeasonalityMode::Additive => g + s,
        SeasonalityMode::Multiplicative => g.component_mul(&s.add_scalar(1.0)),
    }
}

fn assemble_model(
    series: &Series,
    mode: SeasonalityMode,
    (first_date, last_date, span_days, y_scale): (NaiveDate, NaiveDate, f64, f64),
    changepoints: &[(NaiveDate, f64)],
    layout: &SeasonalLayout,
    solution: &Solution,
    sigma: f64,
) -> FittedModel {
    let trend = TrendParams {
        m: solution.trend[0],
        k: solution.trend[1],
        changepoints: changepoints
            .iter()
            .enumerate()
            .map(|(j, (date, t))| Changepoint {
                date: *date,
                t: *t,
                delta: solution.trend[2 + j],
            })
            .collect(),
    };

    let mut col = 0;
    let seasonalities: Vec<SeasonalComponent> = layout
        .seasonalities
        .iter()
        .map(|(name, period, order)| {
            let width = 2 * order;
            let coefficients = solution.seasonal.rows(col, width).iter().copied().collect();
            col += width;
            SeasonalComponent {
                name: name.clone(),
                period: *period,
                order: *order,
                coefficients,
            }
        })
        .collect();

    let holidays: Vec<HolidayEffect> = layout
        .holidays
        .iter()
        .map(|(label, dates)| {
            let effect = solution.seasonal[col];
            col += 1;
            HolidayEffect {
                label: label.clone(),
                dates: dates.clone(),
                effect,
            }
        })
        .collect();

    FittedModel {
        group: series.group.clone(),
        first_date,
        last_date,
        span_days,
        y_scale,
        mode,
        trend,
        seasonalities,
        holidays,
        sigma,
        n_obs: series.len(),
        iterations: solution.iterations,
        history: series.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyObservation, Holiday};
    use chrono::{Datelike, Duration};
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn series_from(start: NaiveDate, values: &[f64]) -> Series {
        Series {
            group: None,
            observations: values
                .iter()
                .enumerate()
                .map(|(i, &v)| DailyObservation {
                    date: start + Duration::days(i as i64),
                    value: v,
                    profit: 0.0,
                    quantity: 0.0,
                    group: None,
                })
                .collect(),
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    #[test]
    fn constant_series_has_no_seasonality() {
        let series = series_from(start(), &vec![100.0; 365]);
        let model = fit(&series, &ModelOptions::default()).unwrap();

        let weekly = model.seasonal_amplitude("weekly").unwrap();
        assert!(weekly < 1e-6, "weekly amplitude should vanish, got {weekly}");
        if let Some(yearly) = model.seasonal_amplitude("yearly") {
            assert!(yearly < 1e-6, "yearly amplitude should vanish, got {yearly}");
        }
        assert!(model.sigma < 1e-6);

        let c = model.components_at(start() + Duration::days(400));
        assert!((c.yhat - 100.0).abs() < 1e-3, "forecast drifted: {}", c.yhat);
    }

    #[test]
    fn level_shift_is_captured_by_trend() {
        let mut values = vec![50.0; 180];
        values.extend(vec![150.0; 185]);
        let series = series_from(start(), &values);

        for mode in [SeasonalityMode::Multiplicative, SeasonalityMode::Additive] {
            let opts = ModelOptions {
                seasonality_mode: mode,
                ..ModelOptions::default()
            };
            let model = fit(&series, &opts).unwrap();

            let shift_day = start() + Duration::days(180);
            let top = model.largest_changepoints(1);
            let gap = (top[0].date - shift_day).num_days().abs();
            assert!(gap <= 15, "{mode:?}: largest changepoint {} is {gap} days from the shift", top[0].date);

            let before = model.components_at(start() + Duration::days(100));
            let after = model.components_at(start() + Duration::days(300));
            assert!((before.trend - 50.0).abs() < 5.0, "{mode:?}: trend before = {}", before.trend);
            assert!((after.trend - 150.0).abs() < 5.0, "{mode:?}: trend after = {}", after.trend);

            let weekly = model.seasonal_amplitude("weekly").unwrap();
            assert!(weekly < 0.1, "{mode:?}: shift leaked into weekly terms ({weekly})");
        }
    }

    #[test]
    fn noisy_level_shift_keeps_trend_levels() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 5.0).unwrap();
        let values: Vec<f64> = (0..365)
            .map(|i| if i < 180 { 50.0 } else { 150.0 } + noise.sample(&mut rng))
            .collect();
        let series = series_from(start(), &values);

        for mode in [SeasonalityMode::Multiplicative, SeasonalityMode::Additive] {
            let opts = ModelOptions {
                seasonality_mode: mode,
                ..ModelOptions::default()
            };
            let model = fit(&series, &opts).unwrap();

            // Ridge smoothing may spread the step over a few changepoints, but
            // well away from it the trend sits on each level.
            let before = model.components_at(start() + Duration::days(60));
            let after = model.components_at(start() + Duration::days(330));
            assert!((before.trend - 50.0).abs() < 8.0, "{mode:?}: trend before = {}", before.trend);
            assert!((after.trend - 150.0).abs() < 8.0, "{mode:?}: trend after = {}", after.trend);

            let rise = model.components_at(start() + Duration::days(250)).trend
                - model.components_at(start() + Duration::days(110)).trend;
            assert!(rise > 80.0, "{mode:?}: trend rose only {rise} across the shift");
        }
    }

    #[test]
    fn alternating_solve_reports_non_convergence() {
        let values: Vec<f64> = (0..120).map(|i| 100.0 + 20.0 * (i % 7) as f64).collect();
        let series = series_from(start(), &values);

        let capped = ModelOptions {
            max_iterations: 1,
            ..ModelOptions::default()
        };
        let err = fit(&series, &capped).unwrap_err();
        assert_eq!(err.kind(), "FitDivergenceError");
        assert!(err.to_string().contains("did not converge"), "{err}");

        let model = fit(&series, &ModelOptions::default()).unwrap();
        assert!(model.iterations >= 2 && model.iterations <= ModelOptions::default().max_iterations);
    }

    #[test]
    fn shared_label_keeps_per_date_windows() {
        let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
        let values: Vec<f64> = (0..365).map(|i| 100.0 + (i % 7) as f64).collect();
        let series = series_from(start(), &values);
        let opts = ModelOptions {
            holidays: vec![
                Holiday {
                    date: d(5, 29),
                    label: "Long weekend".into(),
                    window: 0,
                },
                Holiday {
                    date: d(9, 4),
                    label: "Long weekend".into(),
                    window: 2,
                },
            ],
            ..ModelOptions::default()
        };

        let layout = resolve_layout(&series, &series.dates(), 364.0, &opts);
        assert_eq!(layout.holidays.len(), 1);
        let (_, occurrences) = &layout.holidays[0];
        assert!(holiday_active(d(9, 2), occurrences));
        assert!(!holiday_active(d(5, 30), occurrences));

        let model = fit(&series, &opts).unwrap();
        assert_eq!(
            model.holidays[0].dates.iter().map(|h| h.window).collect::<Vec<_>>(),
            vec![0, 2]
        );
    }

    #[test]
    fn weekly_pattern_is_recovered() {
        // 2 years of a weekday effect on a gentle upward trend.
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let values: Vec<f64> = (0..730)
            .map(|i| {
                let d = start() + Duration::days(i);
                let weekend = matches!(d.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun);
                let base = 200.0 + 0.05 * i as f64;
                base * if weekend { 0.7 } else { 1.1 } + noise.sample(&mut rng)
            })
            .collect();
        let series = series_from(start(), &values);
        let model = fit(&series, &ModelOptions::default()).unwrap();

        let sat = model.components_at(NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
        let wed = model.components_at(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
        assert!(wed.yhat > sat.yhat * 1.3, "weekday {} vs weekend {}", wed.yhat, sat.yhat);
    }

    #[test]
    fn holiday_effect_is_fitted() {
        let holiday_dates: Vec<NaiveDate> = (0..3)
            .map(|y| NaiveDate::from_ymd_opt(2023 + y, 7, 4).unwrap())
            .collect();
        let values: Vec<f64> = (0..900)
            .map(|i| {
                let d = start() + Duration::days(i);
                if holiday_dates.contains(&d) { 300.0 } else { 100.0 }
            })
            .collect();
        let series = series_from(start(), &values);
        let opts = ModelOptions {
            seasonality_mode: SeasonalityMode::Additive,
            holidays: holiday_dates
                .iter()
                .map(|d| Holiday {
                    date: *d,
                    label: "Independence Day".into(),
                    window: 0,
                })
                .collect(),
            ..ModelOptions::default()
        };
        let model = fit(&series, &opts).unwrap();
        assert_eq!(model.holidays.len(), 1);

        // Future occurrence on a date the model never saw.
        let mut future = model.clone();
        future.holidays[0].dates.push(HolidayDate {
            date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            window: 0,
        });
        let c = future.components_at(NaiveDate::from_ymd_opt(2026, 7, 4).unwrap());
        assert!((c.holiday - 200.0).abs() < 20.0, "holiday effect = {}", c.holiday);
    }

    #[test]
    fn zero_series_diverges() {
        let series = series_from(start(), &[0.0; 30]);
        let err = fit(&series, &ModelOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "FitDivergenceError");
    }

    #[test]
    fn invalid_flexibility_is_rejected() {
        let series = series_from(start(), &[1.0, 2.0, 3.0]);
        let opts = ModelOptions {
            changepoint_flexibility: 0.0,
            ..ModelOptions::default()
        };
        assert!(matches!(fit(&series, &opts), Err(ForecastError::InvalidOption(_))));
    }

    #[test]
    fn short_history_drops_yearly() {
        let values: Vec<f64> = (0..60).map(|i| 10.0 + (i % 7) as f64).collect();
        let series = series_from(start(), &values);
        let model = fit(&series, &ModelOptions::default()).unwrap();
        assert!(model.seasonal_amplitude("yearly").is_none());
        assert!(model.seasonal_amplitude("weekly").is_some());
    }
}

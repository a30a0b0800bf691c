//! In-sample accuracy of a forecast against its history.
//!
//! Forecast points are joined to actuals on date, over the historical range
//! only. Future points have no actual and are ignored.

use crate::domain::{Accuracy, ForecastPoint, Series};
use crate::error::{ForecastError, Result};

/// Absolute and percentage errors for every date present in both inputs.
fn joined_errors(series: &Series, points: &[ForecastPoint]) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter_map(|p| series.value_on(p.date).map(|actual| (actual, p.point_estimate)))
        .collect()
}

/// MAE and MAPE (percent) over the historical range.
///
/// Fails with `UndefinedMetric` when there is nothing to compare or when any
/// actual is zero (MAPE divides by it).
pub fn evaluate_accuracy(series: &Series, points: &[ForecastPoint]) -> Result<Accuracy> {
    let accuracy = evaluate_accuracy_lenient(series, points)?;
    if accuracy.mape.is_none() {
        return Err(ForecastError::UndefinedMetric(
            "MAPE is undefined: at least one actual value is zero".into(),
        ));
    }
    Ok(accuracy)
}

/// Like `evaluate_accuracy`, but reports an undefined MAPE as `None`.
pub fn evaluate_accuracy_lenient(series: &Series, points: &[ForecastPoint]) -> Result<Accuracy> {
    let pairs = joined_errors(series, points);
    if pairs.is_empty() {
        return Err(ForecastError::UndefinedMetric(
            "no forecast points overlap the history".into(),
        ));
    }
    let n = pairs.len() as f64;

    let mae = pairs.iter().map(|(a, f)| (a - f).abs()).sum::<f64>() / n;
    let mape = if pairs.iter().any(|(a, _)| *a == 0.0) {
        None
    } else {
        Some(pairs.iter().map(|(a, f)| ((a - f) / a).abs()).sum::<f64>() / n * 100.0)
    };

    Ok(Accuracy {
        mae,
        mape,
        n: pairs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyObservation;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[f64]) -> Series {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Series {
            group: None,
            observations: values
                .iter()
                .enumerate()
                .map(|(i, &v)| DailyObservation {
                    date: d0 + Duration::days(i as i64),
                    value: v,
                    profit: 0.0,
                    quantity: 0.0,
                    group: None,
                })
                .collect(),
        }
    }

    fn points(s: &Series, extra_future: usize, bias: f64) -> Vec<ForecastPoint> {
        let mut out: Vec<ForecastPoint> = s
            .observations
            .iter()
            .map(|o| ForecastPoint {
                date: o.date,
                point_estimate: o.value + bias,
                lower_bound: o.value + bias,
                upper_bound: o.value + bias,
                trend: o.value,
                seasonal: 0.0,
                holiday: 0.0,
            })
            .collect();
        let last = s.last_date().unwrap();
        for i in 1..=extra_future {
            out.push(ForecastPoint {
                date: last + Duration::days(i as i64),
                point_estimate: 1e9,
                lower_bound: 1e9,
                upper_bound: 1e9,
                trend: 1e9,
                seasonal: 0.0,
                holiday: 0.0,
            });
        }
        out
    }

    #[test]
    fn perfect_forecast_has_zero_error() {
        let s = series(&[10.0, 20.0, 30.0]);
        let acc = evaluate_accuracy(&s, &points(&s, 5, 0.0)).unwrap();
        assert_eq!(acc.n, 3);
        assert!(acc.mae.abs() < 1e-12);
        assert!(acc.mape.unwrap().abs() < 1e-12);
    }

    #[test]
    fn errors_are_averaged_over_history() {
        let s = series(&[10.0, 20.0]);
        let acc = evaluate_accuracy(&s, &points(&s, 0, 2.0)).unwrap();
        assert!((acc.mae - 2.0).abs() < 1e-12);
        // (20% + 10%) / 2
        assert!((acc.mape.unwrap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn zero_actual_makes_mape_undefined() {
        let s = series(&[0.0, 20.0]);
        let p = points(&s, 0, 1.0);
        let err = evaluate_accuracy(&s, &p).unwrap_err();
        assert_eq!(err.kind(), "UndefinedMetricError");

        let lenient = evaluate_accuracy_lenient(&s, &p).unwrap();
        assert!((lenient.mae - 1.0).abs() < 1e-12);
        assert!(lenient.mape.is_none());
    }
}

//! Model evaluation for the seasonal-trend decomposition.
//!
//! The fitter relies on two primitive operations:
//! - build design rows for the trend and seasonal/holiday blocks (for least squares)
//! - evaluate each component at a date given fitted parameters (for residuals/forecasts)
//!
//! Both live here so fitting and forecasting cannot drift apart.

use chrono::NaiveDate;

use crate::domain::{Components, FittedModel, HolidayDate, HolidayEffect, SeasonalComponent, SeasonalityMode, TrendParams};
use crate::math::{fill_fourier, fourier_value, hinge};

/// Days between the series origin and `date` (may be negative).
pub fn days_since(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

/// Fill a trend design row: `[1, t, (t - s_1)_+, ..., (t - s_C)_+]`.
///
/// # Panics
/// Panics if `out.len() != 2 + changepoint_ts.len()`.
pub fn fill_trend_row(t: f64, changepoint_ts: &[f64], out: &mut [f64]) {
    out[0] = 1.0;
    out[1] = t;
    for (j, &s) in changepoint_ts.iter().enumerate() {
        out[2 + j] = hinge(t, s);
    }
}

/// Trend value `g(t)` in scaled units.
pub fn trend_value(trend: &TrendParams, t: f64) -> f64 {
    let mut g = trend.m + trend.k * t;
    for cp in &trend.changepoints {
        g += cp.delta * hinge(t, cp.t);
    }
    g
}

/// Whether `date` falls inside the window of any occurrence.
pub fn holiday_active(date: NaiveDate, dates: &[HolidayDate]) -> bool {
    dates.iter().any(|h| h.covers(date))
}

/// Seasonal sum `s(t)` in scaled units (multiplier in multiplicative mode).
pub fn seasonal_value(seasonalities: &[SeasonalComponent], days: f64) -> f64 {
    seasonalities
        .iter()
        .map(|c| fourier_value(days, c.period, &c.coefficients))
        .sum()
}

/// Holiday sum `h(t)` in scaled units.
pub fn holiday_value(holidays: &[HolidayEffect], date: NaiveDate) -> f64 {
    holidays
        .iter()
        .filter(|h| holiday_active(date, &h.dates))
        .map(|h| h.effect)
        .sum()
}

/// Fill the seasonal + holiday part of a design row.
///
/// Layout: every component's Fourier block in order, then one indicator per holiday.
pub fn fill_seasonal_row(
    date: NaiveDate,
    days: f64,
    seasonalities: &[(f64, usize)],
    holidays: &[&[HolidayDate]],
    out: &mut [f64],
) {
    let mut col = 0;
    for &(period, order) in seasonalities {
        let width = 2 * order;
        fill_fourier(days, period, order, &mut out[col..col + width]);
        col += width;
    }
    for dates in holidays {
        out[col] = if holiday_active(date, dates) { 1.0 } else { 0.0 };
        col += 1;
    }
}

/// Combine components into the scaled prediction.
pub fn compose(mode: SeasonalityMode, g: f64, s: f64, h: f64) -> f64 {
    match mode {
        SeasonalityMode::Additive => g + s + h,
        SeasonalityMode::Multiplicative => g * (1.0 + s + h),
    }
}

impl FittedModel {
    /// Scaled time of `date` (0 at the first observation, 1 at the last).
    pub fn scaled_time(&self, date: NaiveDate) -> f64 {
        days_since(self.first_date, date) / self.span_days
    }

    /// Decompose the model at `date`, in original units.
    ///
    /// Seasonal and holiday parts are reported as contributions to `yhat`, so
    /// `trend + seasonal + holiday == yhat` in both modes.
    pub fn components_at(&self, date: NaiveDate) -> Components {
        let g = trend_value(&self.trend, self.scaled_time(date));
        let s = seasonal_value(&self.seasonalities, days_since(self.first_date, date));
        let h = holiday_value(&self.holidays, date);
        self.components_from(g, s, h)
    }

    fn components_from(&self, g: f64, s: f64, h: f64) -> Components {
        let scale = self.y_scale;
        let (seasonal, holiday) = match self.mode {
            SeasonalityMode::Additive => (s, h),
            SeasonalityMode::Multiplicative => (g * s, g * h),
        };
        Components {
            trend: g * scale,
            seasonal: seasonal * scale,
            holiday: holiday * scale,
            yhat: compose(self.mode, g, s, h) * scale,
        }
    }

    /// Peak-to-trough range of a named seasonal component over one period,
    /// in scaled units.
    pub fn seasonal_amplitude(&self, name: &str) -> Option<f64> {
        let component = self.seasonalities.iter().find(|c| c.name == name)?;
        let steps = (component.period.ceil() as usize).max(7) * 4;
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for i in 0..steps {
            let d = component.period * i as f64 / steps as f64;
            let v = fourier_value(d, component.period, &component.coefficients);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        Some(hi - lo)
    }

    /// Changepoints ordered by decreasing `|delta|`.
    pub fn largest_changepoints(&self, n: usize) -> Vec<&crate::domain::Changepoint> {
        let mut cps: Vec<_> = self.trend.changepoints.iter().collect();
        cps.sort_by(|a, b| {
            b.delta
                .abs()
                .partial_cmp(&a.delta.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cps.truncate(n);
        cps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Changepoint;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn trend_bends_at_changepoint() {
        let trend = TrendParams {
            k: 1.0,
            m: 0.5,
            changepoints: vec![Changepoint {
                date: date("2024-01-01"),
                t: 0.5,
                delta: -1.0,
            }],
        };
        assert!((trend_value(&trend, 0.25) - 0.75).abs() < 1e-12);
        // Slope is zero after the changepoint.
        assert!((trend_value(&trend, 0.75) - trend_value(&trend, 1.0)).abs() < 1e-12);

        let mut row = vec![0.0; 3];
        fill_trend_row(0.75, &[0.5], &mut row);
        let g: f64 = row.iter().zip([0.5, 1.0, -1.0]).map(|(x, b)| x * b).sum();
        assert!((g - trend_value(&trend, 0.75)).abs() < 1e-12);
    }

    fn occurrence(s: &str, window: u32) -> HolidayDate {
        HolidayDate { date: date(s), window }
    }

    #[test]
    fn holiday_window_is_symmetric() {
        let wide = [occurrence("2024-07-04", 2)];
        assert!(holiday_active(date("2024-07-02"), &wide));
        assert!(holiday_active(date("2024-07-06"), &wide));
        assert!(!holiday_active(date("2024-07-07"), &wide));
        assert!(!holiday_active(date("2024-07-05"), &[occurrence("2024-07-04", 0)]));
    }

    #[test]
    fn each_occurrence_keeps_its_window() {
        let dates = [occurrence("2023-11-23", 0), occurrence("2024-11-28", 3)];
        assert!(!holiday_active(date("2023-11-24"), &dates));
        assert!(holiday_active(date("2024-12-01"), &dates));
        assert!(!holiday_active(date("2024-12-02"), &dates));
    }

    #[test]
    fn seasonal_row_layout() {
        let mut row = vec![0.0; 2 * 3 + 1];
        let christmas = [occurrence("2024-12-25", 0)];
        fill_seasonal_row(date("2024-12-25"), 10.0, &[(7.0, 3)], &[&christmas[..]], &mut row);
        assert_eq!(row[6], 1.0);
        assert!((row[0] - (2.0 * std::f64::consts::PI * 10.0 / 7.0).sin()).abs() < 1e-12);
    }

    #[test]
    fn compose_modes() {
        assert!((compose(SeasonalityMode::Additive, 1.0, 0.2, 0.1) - 1.3).abs() < 1e-12);
        assert!((compose(SeasonalityMode::Multiplicative, 2.0, 0.2, 0.1) - 2.6).abs() < 1e-12);
    }
}

//! Monthly re-aggregation of a daily forecast.
//!
//! Values are averaged, not summed: a monthly figure is a daily rate, so a
//! partial month (e.g. the last month of the horizon) stays comparable with a
//! full one.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{ForecastPoint, MonthlySummary, month_abbr, year_month};

#[derive(Debug, Default)]
struct MonthAccumulator {
    point: f64,
    lower: f64,
    upper: f64,
    days: usize,
}

/// Average the points strictly after `cutoff` by calendar month.
///
/// Months come back in chronological order.
pub fn summarize_monthly(points: &[ForecastPoint], cutoff: NaiveDate) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<(i32, u32), MonthAccumulator> = BTreeMap::new();
    for p in points.iter().filter(|p| p.is_future(cutoff)) {
        let acc = months.entry(year_month(p.date)).or_default();
        acc.point += p.point_estimate;
        acc.lower += p.lower_bound;
        acc.upper += p.upper_bound;
        acc.days += 1;
    }

    months
        .into_iter()
        .map(|((year, month), acc)| {
            let n = acc.days as f64;
            let month_name = month_abbr(month).to_string();
            MonthlySummary {
                year,
                month,
                period: format!("{year}-{month_name}"),
                month_name,
                mean_point_estimate: acc.point / n,
                mean_lower_bound: acc.lower / n,
                mean_upper_bound: acc.upper / n,
                days: acc.days,
            }
        })
        .collect()
}

//! Daily aggregation of raw records.
//!
//! Records are summed per calendar date. Aggregation preserves totals: the sum
//! of a produced series equals the sum of the records that went into it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{DailyObservation, GroupBy, MonthlyHistory, SalesRecord, Series, year_month};
use crate::error::{ForecastError, Result};

/// Minimum number of distinct dates a series needs to be fit.
pub const MIN_DISTINCT_DATES: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
struct DayTotals {
    value: f64,
    profit: f64,
    quantity: f64,
}

/// Aggregate records into one daily series.
///
/// With `filter = None` every record contributes (the overall series). With
/// `filter = Some((by, key))` only records whose `by` label equals `key` do.
pub fn aggregate(records: &[SalesRecord], filter: Option<(GroupBy, &str)>) -> Result<Series> {
    let group = filter.map(|(_, key)| key.to_string());
    let selected = records.iter().filter(|r| match filter {
        None | Some((GroupBy::Total, _)) => true,
        Some((by, key)) => r.key(by) == Some(key),
    });

    let days = sum_by_date(selected)?;
    build_series(group, days)
}

/// Aggregate records into one series per distinct key of `by`.
///
/// Keys come back in sorted order. A key with too few distinct dates is
/// returned as an `EmptySeries` error in its own slot rather than failing the
/// whole call, so callers can report it per key.
pub fn aggregate_groups(records: &[SalesRecord], by: GroupBy) -> Result<BTreeMap<String, Result<Series>>> {
    if by == GroupBy::Total {
        let series = aggregate(records, None);
        return Ok(BTreeMap::from([("Total".to_string(), series)]));
    }

    let mut buckets: BTreeMap<String, BTreeMap<NaiveDate, DayTotals>> = BTreeMap::new();
    let mut unlabeled = 0usize;
    for record in records {
        let Some(key) = record.key(by) else {
            unlabeled += 1;
            continue;
        };
        let day = buckets
            .entry(key.to_string())
            .or_default()
            .entry(record.order_date)
            .or_default();
        accumulate(day, record)?;
    }
    if unlabeled > 0 {
        debug!(unlabeled, dimension = by.label(), "records without a group label were skipped");
    }

    Ok(buckets
        .into_iter()
        .map(|(key, days)| {
            let series = build_series(Some(key.clone()), days);
            (key, series)
        })
        .collect())
}

/// Group raw records by calendar month and average the per-day totals.
///
/// This is the historical counterpart of the monthly forecast summary: both
/// report a daily rate, not a monthly total.
pub fn aggregate_monthly(records: &[SalesRecord]) -> Result<Vec<MonthlyHistory>> {
    let days = sum_by_date(records.iter())?;

    let mut months: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for (date, totals) in days {
        let slot = months.entry(year_month(date)).or_insert((0.0, 0));
        slot.0 += totals.value;
        slot.1 += 1;
    }

    Ok(months
        .into_iter()
        .map(|((year, month), (sum, days))| MonthlyHistory {
            year,
            month,
            mean_daily_value: sum / days as f64,
            days,
        })
        .collect())
}

fn sum_by_date<'a>(records: impl Iterator<Item = &'a SalesRecord>) -> Result<BTreeMap<NaiveDate, DayTotals>> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for record in records {
        accumulate(days.entry(record.order_date).or_default(), record)?;
    }
    Ok(days)
}

fn accumulate(day: &mut DayTotals, record: &SalesRecord) -> Result<()> {
    let sales = record.sales.ok_or_else(|| {
        ForecastError::schema(format!("record on {} is missing `sales`", record.order_date))
    })?;
    if !sales.is_finite() {
        return Err(ForecastError::schema(format!(
            "record on {} has non-finite `sales`",
            record.order_date
        )));
    }
    day.value += sales;
    day.profit += record.profit.filter(|v| v.is_finite()).unwrap_or(0.0);
    day.quantity += record.quantity.filter(|v| v.is_finite()).unwrap_or(0.0);
    Ok(())
}

fn build_series(group: Option<String>, days: BTreeMap<NaiveDate, DayTotals>) -> Result<Series> {
    if days.len() < MIN_DISTINCT_DATES {
        return Err(ForecastError::EmptySeries {
            group,
            distinct_dates: days.len(),
        });
    }

    // BTreeMap iteration is date-ordered, so dates come out strictly increasing.
    let observations = days
        .into_iter()
        .map(|(date, t)| DailyObservation {
            date,
            value: t.value,
            profit: t.profit,
            quantity: t.quantity,
            group: group.clone(),
        })
        .collect();

    Ok(Series { group, observations })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, sales: f64, category: &str, region: &str) -> SalesRecord {
        SalesRecord {
            order_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            sales: Some(sales),
            profit: Some(sales * 0.1),
            quantity: Some(1.0),
            category: Some(category.to_string()),
            region: Some(region.to_string()),
        }
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            rec("2024-01-02", 10.0, "Furniture", "East"),
            rec("2024-01-01", 5.5, "Technology", "West"),
            rec("2024-01-02", 2.25, "Technology", "East"),
            rec("2024-01-03", 7.0, "Furniture", "West"),
            rec("2024-01-01", 1.0, "Furniture", "East"),
        ]
    }

    #[test]
    fn aggregate_preserves_totals_and_orders_dates() {
        let records = sample();
        let series = aggregate(&records, None).unwrap();

        let raw: f64 = records.iter().filter_map(|r| r.sales).sum();
        assert!((series.total() - raw).abs() < 1e-12);

        let dates = series.dates();
        assert!(dates.windows(2).all(|w| w[0] < w[1]), "dates must be strictly increasing");
        assert_eq!(series.len(), 3);
        assert_eq!(series.observations[0].value, 6.5);
        assert_eq!(series.observations[0].quantity, 2.0);
    }

    #[test]
    fn aggregate_by_key_filters_records() {
        let series = aggregate(&sample(), Some((GroupBy::Category, "Furniture"))).unwrap();
        assert_eq!(series.group.as_deref(), Some("Furniture"));
        assert!((series.total() - 18.0).abs() < 1e-12);
    }

    #[test]
    fn too_few_dates_is_empty_series() {
        let records = vec![rec("2024-01-01", 1.0, "A", "East"), rec("2024-01-01", 2.0, "A", "East")];
        let err = aggregate(&records, None).unwrap_err();
        assert_eq!(
            err,
            ForecastError::EmptySeries {
                group: None,
                distinct_dates: 1
            }
        );
    }

    #[test]
    fn groups_isolate_short_keys() {
        let groups = aggregate_groups(&sample(), GroupBy::Region).unwrap();
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["East", "West"]);

        let east = groups["East"].as_ref().unwrap();
        assert_eq!(east.len(), 2);
        // West has two distinct dates too; make one key short.
        let mut records = sample();
        records.push(rec("2024-01-05", 3.0, "Office Supplies", "South"));
        let groups = aggregate_groups(&records, GroupBy::Region).unwrap();
        assert!(matches!(groups["South"], Err(ForecastError::EmptySeries { .. })));
        assert!(groups["East"].is_ok());
    }

    #[test]
    fn missing_sales_is_schema_error() {
        let mut records = sample();
        records[2].sales = None;
        let err = aggregate(&records, None).unwrap_err();
        assert_eq!(err.kind(), "SchemaError");
    }

    #[test]
    fn absent_profit_counts_as_zero() {
        let mut records = sample();
        for r in &mut records {
            r.profit = None;
        }
        let series = aggregate(&records, None).unwrap();
        assert!(series.observations.iter().all(|o| o.profit == 0.0));
    }

    #[test]
    fn monthly_history_averages_daily_totals() {
        let records = vec![
            rec("2024-01-30", 10.0, "A", "East"),
            rec("2024-01-30", 20.0, "A", "East"),
            rec("2024-01-31", 60.0, "A", "East"),
            rec("2024-02-01", 5.0, "A", "East"),
        ];
        let months = aggregate_monthly(&records).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 1));
        assert!((months[0].mean_daily_value - 45.0).abs() < 1e-12);
        assert_eq!(months[0].days, 2);
        assert!((months[1].mean_daily_value - 5.0).abs() < 1e-12);
    }
}

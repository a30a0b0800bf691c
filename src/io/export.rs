//! CSV exports of a report bundle.
//!
//! Column names follow the dashboard's expectations (`ds`, `yhat`,
//! `yhat_lower`, `yhat_upper`, ...), so the files are easy to consume in
//! spreadsheets or downstream scripts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{ForecastPoint, GroupBy, MonthlySummary, Rollup};
use crate::error::AppError;
use crate::math::round_to;
use crate::report::{DailyForecastRow, GroupOutcome, ReportBundle};

#[derive(Debug, Serialize)]
struct DailyCsvRow {
    ds: String,
    yhat: f64,
    yhat_lower: f64,
    yhat_upper: f64,
    actual_sales: Option<f64>,
}

#[derive(Debug, Serialize)]
struct MonthlyCsvRow<'a> {
    year: i32,
    month: u32,
    month_name: &'a str,
    period: &'a str,
    yhat: f64,
    yhat_lower: f64,
    yhat_upper: f64,
}

#[derive(Debug, Serialize)]
struct GroupCsvRow {
    ds: String,
    yhat: f64,
    yhat_lower: f64,
    yhat_upper: f64,
}

/// Write every CSV and JSON export into `dir` (created if missing).
///
/// Returns the paths written, in a stable order.
pub fn write_all(dir: &Path, bundle: &ReportBundle) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;

    let mut written = Vec::new();

    let path = dir.join("daily_forecast.csv");
    write_daily_csv(&path, &bundle.daily)?;
    written.push(path);

    let path = dir.join("monthly_forecast.csv");
    write_monthly_csv(&path, bundle.monthly())?;
    written.push(path);

    let path = dir.join("category_analysis.csv");
    write_rollup_csv(&path, bundle.rollups(GroupBy::Category), GroupBy::Category)?;
    written.push(path);

    let path = dir.join("regional_analysis.csv");
    write_rollup_csv(&path, bundle.rollups(GroupBy::Region), GroupBy::Region)?;
    written.push(path);

    for (key, outcome) in &bundle.groups {
        if let GroupOutcome::Forecast { points, .. } = outcome {
            let path = dir.join(format!("forecast_{}.csv", slug(key)));
            write_group_csv(&path, points)?;
            written.push(path);
        }
    }

    let path = dir.join("forecast_summary.json");
    crate::io::model::write_summary_json(&path, &bundle.kpis)?;
    written.push(path);

    let path = dir.join("model.json");
    crate::io::model::write_model_json(&path, &bundle.model)?;
    written.push(path);

    Ok(written)
}

/// Write the daily forecast joined with actuals.
pub fn write_daily_csv(path: &Path, rows: &[DailyForecastRow]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    for r in rows {
        writer
            .serialize(DailyCsvRow {
                ds: r.date.format("%Y-%m-%d").to_string(),
                yhat: r.point_estimate,
                yhat_lower: r.lower_bound,
                yhat_upper: r.upper_bound,
                actual_sales: r.actual,
            })
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
}

/// Write the monthly forecast table (values rounded to cents).
pub fn write_monthly_csv(path: &Path, rows: &[MonthlySummary]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    for m in rows {
        writer
            .serialize(MonthlyCsvRow {
                year: m.year,
                month: m.month,
                month_name: &m.month_name,
                period: &m.period,
                yhat: round_to(m.mean_point_estimate, 2),
                yhat_lower: round_to(m.mean_lower_bound, 2),
                yhat_upper: round_to(m.mean_upper_bound, 2),
            })
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
}

/// Write a rollup table with a `<Key>, Sales_sum, Sales_mean, ...` header.
pub fn write_rollup_csv(path: &Path, rows: &[Rollup], by: GroupBy) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record([
            by.label(),
            "Sales_sum",
            "Sales_mean",
            "Profit_sum",
            "Profit_mean",
            "Quantity_sum",
            "Quantity_mean",
        ])
        .map_err(|e| csv_error(path, e))?;
    for r in rows {
        writer
            .write_record([
                r.key.clone(),
                r.sum_value.to_string(),
                r.mean_value.to_string(),
                r.sum_profit.to_string(),
                r.mean_profit.to_string(),
                r.sum_quantity.to_string(),
                r.mean_quantity.to_string(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
}

/// Write one group's forecast (`ds, yhat, yhat_lower, yhat_upper`).
pub fn write_group_csv(path: &Path, points: &[ForecastPoint]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    for p in points {
        writer
            .serialize(GroupCsvRow {
                ds: p.date.format("%Y-%m-%d").to_string(),
                yhat: round_to(p.point_estimate, 2),
                yhat_lower: round_to(p.lower_bound, 2),
                yhat_upper: round_to(p.upper_bound, 2),
            })
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
}

/// File-name slug of a group key: lowercase, spaces to underscores.
pub fn slug(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn create_writer(path: &Path) -> Result<csv::Writer<fs::File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn csv_error(path: &Path, e: csv::Error) -> AppError {
    AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn slugs_match_file_naming() {
        assert_eq!(slug("Office Supplies"), "office_supplies");
        assert_eq!(slug("Technology"), "technology");
    }

    #[test]
    fn daily_csv_has_dashboard_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        let rows = vec![
            DailyForecastRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                point_estimate: 10.5,
                lower_bound: 9.0,
                upper_bound: 12.0,
                actual: Some(11.0),
            },
            DailyForecastRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                point_estimate: 10.0,
                lower_bound: 8.0,
                upper_bound: 12.0,
                actual: None,
            },
        ];
        write_daily_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ds,yhat,yhat_lower,yhat_upper,actual_sales");
        assert_eq!(lines[1], "2024-01-01,10.5,9.0,12.0,11.0");
        assert_eq!(lines[2], "2024-01-02,10.0,8.0,12.0,");
    }

    #[test]
    fn rollup_csv_uses_dimension_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regional.csv");
        let rows = vec![Rollup {
            key: "West".into(),
            sum_value: 300.0,
            mean_value: 150.0,
            sum_profit: 30.0,
            mean_profit: 15.0,
            sum_quantity: 4.0,
            mean_quantity: 2.0,
            count: 2,
            share_of_value: 1.0,
        }];
        write_rollup_csv(&path, &rows, GroupBy::Region).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Region,Sales_sum,Sales_mean,Profit_sum,Profit_mean,Quantity_sum,Quantity_mean"
        );
        assert_eq!(lines.next().unwrap(), "West,300,150,30,15,4,2");
    }
}

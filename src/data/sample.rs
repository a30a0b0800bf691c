//! Synthetic Superstore-like transaction records.
//!
//! Sales are lognormal with a calendar-month multiplier (weak Q1, strong Q4),
//! so the generated history carries a clear yearly pattern for the model to
//! pick up.

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;
use serde::Serialize;

use crate::domain::SalesRecord;
use crate::error::AppError;
use crate::math::round_to;

pub const CATEGORIES: [&str; 3] = ["Furniture", "Office Supplies", "Technology"];
pub const REGIONS: [&str; 4] = ["East", "West", "Central", "South"];

/// Sales multiplier by calendar month (index 0 = January).
const MONTH_MULTIPLIER: [f64; 12] = [0.7, 0.8, 0.9, 1.0, 1.0, 1.1, 1.1, 1.2, 1.1, 1.3, 1.5, 1.6];

/// Upper bound (exclusive) of the uniform discount.
const MAX_DISCOUNT: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Rows generated per calendar day in the range (order dates are then
    /// drawn uniformly, so individual days vary).
    pub records_per_day: usize,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            records_per_day: 3,
            seed: 42,
        }
    }
}

/// Generate synthetic records, sorted by order date.
pub fn generate_superstore(config: &SampleConfig) -> Result<Vec<SalesRecord>, AppError> {
    if config.end < config.start {
        return Err(AppError::new(2, "Sample end date must not precede the start date."));
    }
    if config.records_per_day == 0 {
        return Err(AppError::new(2, "Records per day must be > 0."));
    }

    let days = (config.end - config.start).num_days() + 1;
    let n_records = days as usize * config.records_per_day;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let sales_dist = LogNormal::new(6.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Sales distribution error: {e}")))?;

    let mut records: Vec<SalesRecord> = (0..n_records)
        .map(|_| {
            let order_date = config.start + Duration::days(rng.gen_range(0..days));
            let multiplier = MONTH_MULTIPLIER[order_date.month0() as usize];
            let sales = sales_dist.sample(&mut rng) * multiplier;
            let quantity = rng.gen_range(1..10) as f64;
            let discount = rng.gen_range(0.0..MAX_DISCOUNT);
            let margin = 0.2 + rng.gen_range(0.0..0.2);
            let profit = sales * margin - sales * discount * 0.5;

            SalesRecord {
                order_date,
                sales: Some(round_to(sales, 4)),
                profit: Some(round_to(profit, 4)),
                quantity: Some(quantity),
                category: CATEGORIES.choose(&mut rng).map(|s| s.to_string()),
                region: REGIONS.choose(&mut rng).map(|s| s.to_string()),
            }
        })
        .collect();

    records.sort_by_key(|r| r.order_date);
    Ok(records)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SampleCsvRow<'a> {
    #[serde(rename = "Row ID")]
    row_id: usize,
    #[serde(rename = "Order Date")]
    order_date: String,
    category: &'a str,
    region: &'a str,
    sales: f64,
    quantity: f64,
    profit: f64,
}

/// Write records as a Superstore-style CSV that `load_records` reads back.
pub fn write_sample_csv(path: &Path, records: &[SalesRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    for (i, r) in records.iter().enumerate() {
        writer
            .serialize(SampleCsvRow {
                row_id: i + 1,
                order_date: r.order_date.format("%Y-%m-%d").to_string(),
                category: r.category.as_deref().unwrap_or(""),
                region: r.region.as_deref().unwrap_or(""),
                sales: r.sales.unwrap_or(0.0),
                quantity: r.quantity.unwrap_or(0.0),
                profit: r.profit.unwrap_or(0.0),
            })
            .map_err(|e| AppError::new(2, format!("Failed to write sample CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush sample CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SampleConfig {
        SampleConfig {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            records_per_day: 3,
            seed: 42,
        }
    }

    #[test]
    fn generates_expected_shape() {
        let records = generate_superstore(&small()).unwrap();
        assert_eq!(records.len(), 365 * 3);
        assert!(records.windows(2).all(|w| w[0].order_date <= w[1].order_date));
        for r in &records {
            let sales = r.sales.unwrap();
            assert!(sales > 0.0);
            assert!(CATEGORIES.contains(&r.category.as_deref().unwrap()));
            assert!(REGIONS.contains(&r.region.as_deref().unwrap()));
            let q = r.quantity.unwrap();
            assert!((1.0..=9.0).contains(&q));
            // margin ∈ [0.2, 0.4), discount penalty ∈ [0, 0.4)
            let p = r.profit.unwrap();
            assert!(p < 0.4 * sales + 1e-3 && p > -0.2 * sales - 1e-3);
        }
    }

    #[test]
    fn december_outsells_january() {
        let records = generate_superstore(&small()).unwrap();
        let mean_in = |month: u32| {
            let vals: Vec<f64> = records
                .iter()
                .filter(|r| r.order_date.month() == month)
                .filter_map(|r| r.sales)
                .collect();
            vals.iter().sum::<f64>() / vals.len() as f64
        };
        assert!(mean_in(12) > mean_in(1) * 1.3);
    }

    #[test]
    fn same_seed_same_records() {
        let a = generate_superstore(&small()).unwrap();
        let b = generate_superstore(&small()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn csv_reads_back() {
        let records = generate_superstore(&SampleConfig {
            records_per_day: 1,
            ..small()
        })
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("superstore.csv");
        write_sample_csv(&path, &records).unwrap();

        let data = crate::io::ingest::load_records(&path, false).unwrap();
        assert_eq!(data.records.len(), records.len());
        assert_eq!(data.records[0].order_date, records[0].order_date);
        assert_eq!(data.records[0].category, records[0].category);
    }
}

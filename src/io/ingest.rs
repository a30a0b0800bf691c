//! CSV ingest and normalization.
//!
//! This module is responsible for turning a Superstore-style transaction CSV
//! into clean `SalesRecord`s that are safe to aggregate.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** in `--skip-invalid` mode (skip bad rows, but report what happened)
//! - **Separation of concerns**: no aggregation logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::SalesRecord;
use crate::error::{AppError, ForecastError};

/// Columns that must exist in the header.
const REQUIRED_COLUMNS: [&str; 2] = ["order_date", "sales"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed records + skipped rows.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<SalesRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.records.len()
    }
}

/// Load and normalize a CSV file into `SalesRecord`s.
pub fn load_records(path: &Path, skip_invalid: bool) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = read_records(file, skip_invalid)?;

    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used(),
        skipped = data.row_errors.len(),
        "records loaded"
    );
    Ok(data)
}

/// Parse records from any reader.
///
/// Strict mode fails on the first bad row with a `SchemaError` carrying its
/// line number. With `skip_invalid`, bad rows are collected as `RowError`s.
pub fn read_records<R: Read>(reader: R, skip_invalid: bool) -> Result<IngestedData, ForecastError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| ForecastError::schema(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &header_map));

        match parsed {
            Ok(record) => records.push(record),
            Err(message) if skip_invalid => row_errors.push(RowError { line, message }),
            Err(message) => return Err(ForecastError::schema_at(line, message)),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), "invalid rows were skipped");
    }

    Ok(IngestedData {
        records,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel sometimes emits UTF-8 CSVs with a BOM prefix on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), ForecastError> {
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(ForecastError::schema(format!("missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<SalesRecord, String> {
    let order_date = parse_date(get_required(record, header_map, "order_date")?)?;

    let sales_raw = get_required(record, header_map, "sales")?;
    let sales = parse_amount(sales_raw).ok_or_else(|| format!("invalid `sales` value '{sales_raw}'"))?;

    let profit = parse_optional_amount(record, header_map, "profit")?;
    let quantity = parse_optional_amount(record, header_map, "quantity")?;

    Ok(SalesRecord {
        order_date,
        sales: Some(sales),
        profit,
        quantity,
        category: get_optional(record, header_map, "category").map(str::to_string),
        region: get_optional(record, header_map, "region").map(str::to_string),
    })
}

fn parse_optional_amount(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<Option<f64>, String> {
    match get_optional(record, header_map, name) {
        None => Ok(None),
        Some(raw) => parse_amount(raw)
            .map(Some)
            .ok_or_else(|| format!("invalid `{name}` value '{raw}'")),
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO first; US exports of the Superstore dataset use `MM/DD/YYYY`.
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    Err(format!(
        "invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD, YYYY-MM-DD HH:MM:SS."
    ))
}

/// Parse a monetary/quantity cell, tolerating `$` and thousands separators.
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
    let v = cleaned.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}Order Date,Sales,Profit,Quantity,Category,Region\n\
        11/08/2016,261.96,41.91,2,Furniture,South\n\
        2016-11-09,\"$1,000.50\",,3,Technology,\n\
        2016/11/10,14.62,6.87,,Office Supplies,West\n";

    #[test]
    fn parses_superstore_layout() {
        let data = read_records(CSV.as_bytes(), false).unwrap();
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.records.len(), 3);

        let first = &data.records[0];
        assert_eq!(first.order_date, NaiveDate::from_ymd_opt(2016, 11, 8).unwrap());
        assert_eq!(first.sales, Some(261.96));
        assert_eq!(first.category.as_deref(), Some("Furniture"));

        let second = &data.records[1];
        assert_eq!(second.sales, Some(1000.5));
        assert_eq!(second.profit, None);
        assert_eq!(second.region, None);

        assert_eq!(data.records[2].quantity, None);
    }

    #[test]
    fn strict_mode_reports_the_line() {
        let csv = "order_date,sales\n2024-01-01,10\nnot-a-date,5\n";
        let err = read_records(csv.as_bytes(), false).unwrap_err();
        match err {
            ForecastError::Schema { line, message } => {
                assert_eq!(line, Some(3));
                assert!(message.contains("not-a-date"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn skip_invalid_collects_row_errors() {
        let csv = "order_date,sales\n2024-01-01,10\n2024-01-02,\n2024-01-03,abc\n2024-01-04,7\n";
        let data = read_records(csv.as_bytes(), true).unwrap();
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 3);
        assert!(data.row_errors[1].message.contains("abc"));
    }

    #[test]
    fn missing_sales_column_is_a_schema_error() {
        let csv = "order_date,profit\n2024-01-01,10\n";
        let err = read_records(csv.as_bytes(), true).unwrap_err();
        assert_eq!(err.kind(), "SchemaError");
    }

    #[test]
    fn datetime_cells_keep_the_date() {
        assert_eq!(
            parse_date("2024-03-05 13:45:00").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(normalize_header_name(" Order-Date "), "order_date");
    }
}

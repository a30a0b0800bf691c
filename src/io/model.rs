//! Read/write JSON artifacts.
//!
//! - `model.json`: the fitted model as a portable value (coefficients in scaled
//!   units plus the scales needed to evaluate them)
//! - `forecast_summary.json`: the run's headline figures

use std::fs::File;
use std::path::Path;

use crate::domain::FittedModel;
use crate::error::AppError;
use crate::report::Kpis;

/// Write a fitted model JSON file.
pub fn write_model_json(path: &Path, model: &FittedModel) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a fitted model JSON file.
pub fn read_model_json(path: &Path) -> Result<FittedModel, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: FittedModel =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    Ok(model)
}

/// Write the run KPIs.
pub fn write_summary_json(path: &Path, kpis: &Kpis) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, kpis)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

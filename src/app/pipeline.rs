//! Shared forecast pipeline logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> aggregate -> fit -> predict -> summaries -> per-group fan-out -> bundle
//!
//! The CLI handlers then only deal with presentation (printing and exports).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Duration;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::aggregate::{aggregate, aggregate_groups};
use crate::data::holidays_between;
use crate::domain::{
    FittedModel, ForecastConfig, ForecastOptions, ForecastPoint, GroupBy, ModelOptions, MonthlySummary, SalesRecord,
    Series,
};
use crate::error::{AppError, ForecastError, Result};
use crate::fit::fit;
use crate::forecast::predict;
use crate::io::ingest::{IngestedData, load_records};
use crate::io::model::read_model_json;
use crate::report::{GroupOutcome, ModelSummary, ReportBundle, ReportParts, assemble};
use crate::summary::{evaluate_accuracy_lenient, rollup, summarize_monthly};

/// All computed outputs of a single `sf forecast` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub bundle: ReportBundle,
}

/// Execute the full pipeline from the configured CSV.
pub fn run_forecast(config: &ForecastConfig) -> std::result::Result<RunOutput, AppError> {
    let ingest = load_records(&config.input, config.skip_invalid)?;
    let bundle = forecast_records(&ingest.records, config)?;
    Ok(RunOutput { ingest, bundle })
}

/// A forecast produced from a previously saved `model.json`.
#[derive(Debug, Clone)]
pub struct SavedModelForecast {
    pub model: FittedModel,
    pub points: Vec<ForecastPoint>,
    pub monthly: Vec<MonthlySummary>,
}

/// Reload a fitted model and forecast `horizon_days` past its last date
/// without refitting.
pub fn forecast_saved_model(
    path: &Path,
    horizon_days: usize,
    opts: &ForecastOptions,
) -> std::result::Result<SavedModelForecast, AppError> {
    let model = read_model_json(path)?;
    info!(
        path = %path.display(),
        group = model.history.label(),
        last_date = %model.last_date,
        "loaded saved model"
    );
    let points = predict(&model, horizon_days, opts)?;
    let monthly = summarize_monthly(&points, model.last_date);
    Ok(SavedModelForecast { model, points, monthly })
}

/// Execute the pipeline on in-memory records.
///
/// Failures of the overall series are returned; failures of a grouped series
/// are recorded in `ReportBundle::groups` under its key.
pub fn forecast_records(records: &[SalesRecord], config: &ForecastConfig) -> Result<ReportBundle> {
    let series = aggregate(records, None)?;
    info!(days = series.len(), total = series.total(), "aggregated daily series");

    let model_opts = model_options_for(&series, config);
    let model = fit(&series, &model_opts)?;
    info!(
        changepoints = model.trend.changepoints.len(),
        seasonalities = model.seasonalities.len(),
        holidays = model.holidays.len(),
        "model fitted"
    );

    let forecast = predict(&model, config.horizon_days, &config.forecast)?;
    let monthly = summarize_monthly(&forecast, model.last_date);
    let accuracy = match evaluate_accuracy_lenient(&series, &forecast) {
        Ok(acc) => {
            if acc.mape.is_none() {
                warn!("MAPE undefined: history contains a zero-sales day");
            }
            Some(acc)
        }
        Err(err) => {
            warn!(error = %err, "accuracy unavailable");
            None
        }
    };

    let category_rollups = rollup(records, GroupBy::Category);
    let region_rollups = rollup(records, GroupBy::Region);

    let mut groups = BTreeMap::new();
    for by in &config.group_forecasts {
        groups.extend(forecast_groups(records, *by, config, &model_opts)?);
    }
    let forecasted = groups.values().filter(|g| g.is_forecast()).count();
    info!(groups = groups.len(), forecasted, "group forecasts complete");

    Ok(assemble(ReportParts {
        series,
        model,
        forecast,
        monthly,
        category_rollups,
        region_rollups,
        accuracy,
        groups,
    }))
}

/// Forecast every key of `by` independently (in parallel).
///
/// Each key's outcome is written into its own slot; one key failing does not
/// affect the others.
pub fn forecast_groups(
    records: &[SalesRecord],
    by: GroupBy,
    config: &ForecastConfig,
    model_opts: &ModelOptions,
) -> Result<BTreeMap<String, GroupOutcome>> {
    if by == GroupBy::Total {
        return Ok(BTreeMap::new());
    }
    let per_key: Vec<(String, Result<Series>)> = aggregate_groups(records, by)?.into_iter().collect();

    Ok(per_key
        .into_par_iter()
        .map(|(label, series)| {
            let outcome = forecast_one(series, config, model_opts);
            match &outcome {
                GroupOutcome::Skipped { reason } => warn!(group = %label, %reason, "group skipped"),
                GroupOutcome::Failed { kind, message } => {
                    warn!(group = %label, kind = %kind, %message, "group forecast failed")
                }
                GroupOutcome::Forecast { .. } => {}
            }
            (group_key(by, &label), outcome)
        })
        .collect())
}

fn forecast_one(series: Result<Series>, config: &ForecastConfig, model_opts: &ModelOptions) -> GroupOutcome {
    let series = match series {
        Ok(s) => s,
        Err(err) => return GroupOutcome::failed(&err),
    };
    if series.len() <= config.min_group_days {
        return GroupOutcome::Skipped {
            reason: format!(
                "only {} days of history (need more than {})",
                series.len(),
                config.min_group_days
            ),
        };
    }

    let result = fit(&series, model_opts).and_then(|model| {
        let points = predict(&model, config.horizon_days, &config.forecast)?;
        let accuracy = evaluate_accuracy_lenient(&series, &points).ok();
        Ok(GroupOutcome::Forecast {
            model_summary: ModelSummary::new(&model, &points, accuracy),
            points,
        })
    });
    result.unwrap_or_else(|err: ForecastError| GroupOutcome::failed(&err))
}

/// Model options for a series, with holidays spanning history + horizon.
pub fn model_options_for(series: &Series, config: &ForecastConfig) -> ModelOptions {
    let mut opts = config.model.clone();
    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        let end = last + Duration::days(config.horizon_days as i64);
        opts.holidays
            .extend(holidays_between(config.holiday_calendar, first, end, config.holiday_window));
    }
    opts
}

/// Result-map key for a group label. Category keys are bare labels.
pub fn group_key(by: GroupBy, label: &str) -> String {
    match by {
        GroupBy::Category | GroupBy::Total => label.to_string(),
        GroupBy::Region => format!("{} {label}", by.label()),
    }
}

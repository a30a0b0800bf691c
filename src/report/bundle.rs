//! Typed result records for exporters and chart renderers.
//!
//! `assemble` is pure: it only rearranges and rounds what the earlier stages
//! produced. Consumers read through the accessors and never mutate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Accuracy, FittedModel, ForecastPoint, GroupBy, MonthlySummary, Rollup, Series};
use crate::error::ForecastError;
use crate::math::round_to;

/// One row of the daily forecast export: forecast joined with the actual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastRow {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub actual: Option<f64>,
}

/// Condensed fit diagnostics for one grouped forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub n_obs: usize,
    /// Residual noise scale in original units.
    pub sigma: f64,
    pub iterations: usize,
    pub last_date: NaiveDate,
    pub horizon_total: f64,
    pub accuracy: Option<Accuracy>,
}

impl ModelSummary {
    pub fn new(model: &FittedModel, points: &[ForecastPoint], accuracy: Option<Accuracy>) -> Self {
        Self {
            n_obs: model.n_obs,
            sigma: model.sigma * model.y_scale,
            iterations: model.iterations,
            last_date: model.last_date,
            horizon_total: points
                .iter()
                .filter(|p| p.is_future(model.last_date))
                .map(|p| p.point_estimate)
                .sum(),
            accuracy,
        }
    }
}

/// What happened to one category/region key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    Forecast {
        model_summary: ModelSummary,
        points: Vec<ForecastPoint>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        kind: String,
        message: String,
    },
}

impl GroupOutcome {
    pub fn failed(err: &ForecastError) -> Self {
        Self::Failed {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self, Self::Forecast { .. })
    }
}

/// Headline figures of a run (`forecast_summary.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_historical_days: usize,
    pub forecast_days: usize,
    pub total_historical_sales: f64,
    pub average_daily_sales: f64,
    pub predicted_horizon_sales: f64,
    pub mae: Option<f64>,
    pub mape: Option<f64>,
    /// `100 - MAPE`, when MAPE is defined.
    pub model_accuracy_pct: Option<f64>,
    pub groups_forecasted: Vec<String>,
}

/// Everything a run produced, keyed for downstream collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub series: Series,
    pub model: FittedModel,
    pub forecast: Vec<ForecastPoint>,
    pub daily: Vec<DailyForecastRow>,
    pub monthly: Vec<MonthlySummary>,
    pub category_rollups: Vec<Rollup>,
    pub region_rollups: Vec<Rollup>,
    pub accuracy: Option<Accuracy>,
    pub groups: BTreeMap<String, GroupOutcome>,
    pub kpis: Kpis,
}

/// Inputs to `assemble`, by stage.
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub series: Series,
    pub model: FittedModel,
    pub forecast: Vec<ForecastPoint>,
    pub monthly: Vec<MonthlySummary>,
    pub category_rollups: Vec<Rollup>,
    pub region_rollups: Vec<Rollup>,
    pub accuracy: Option<Accuracy>,
    pub groups: BTreeMap<String, GroupOutcome>,
}

/// Bundle stage outputs into a `ReportBundle`.
pub fn assemble(parts: ReportParts) -> ReportBundle {
    let cutoff = parts.model.last_date;

    let daily = parts
        .forecast
        .iter()
        .map(|p| DailyForecastRow {
            date: p.date,
            point_estimate: round_to(p.point_estimate, 2),
            lower_bound: round_to(p.lower_bound, 2),
            upper_bound: round_to(p.upper_bound, 2),
            actual: parts.series.value_on(p.date).map(|v| round_to(v, 2)),
        })
        .collect();

    let future: Vec<&ForecastPoint> = parts.forecast.iter().filter(|p| p.is_future(cutoff)).collect();
    let mape = parts.accuracy.as_ref().and_then(|a| a.mape);

    let kpis = Kpis {
        total_historical_days: parts.series.len(),
        forecast_days: future.len(),
        total_historical_sales: round_to(parts.series.total(), 2),
        average_daily_sales: round_to(parts.series.mean(), 2),
        predicted_horizon_sales: round_to(future.iter().map(|p| p.point_estimate).sum(), 2),
        mae: parts.accuracy.as_ref().map(|a| round_to(a.mae, 2)),
        mape: mape.map(|m| round_to(m, 2)),
        model_accuracy_pct: mape.map(|m| round_to(100.0 - m, 1)),
        groups_forecasted: parts
            .groups
            .iter()
            .filter(|(_, outcome)| outcome.is_forecast())
            .map(|(key, _)| key.clone())
            .collect(),
    };

    ReportBundle {
        series: parts.series,
        model: parts.model,
        forecast: parts.forecast,
        daily,
        monthly: parts.monthly,
        category_rollups: parts.category_rollups,
        region_rollups: parts.region_rollups,
        accuracy: parts.accuracy,
        groups: parts.groups,
        kpis,
    }
}

impl ReportBundle {
    pub fn cutoff(&self) -> NaiveDate {
        self.model.last_date
    }

    pub fn history_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        let cutoff = self.cutoff();
        self.forecast.iter().filter(move |p| !p.is_future(cutoff))
    }

    pub fn future_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        let cutoff = self.cutoff();
        self.forecast.iter().filter(move |p| p.is_future(cutoff))
    }

    pub fn monthly(&self) -> &[MonthlySummary] {
        &self.monthly
    }

    /// Rollups along one dimension (empty for `Total`).
    pub fn rollups(&self, by: GroupBy) -> &[Rollup] {
        match by {
            GroupBy::Category => &self.category_rollups,
            GroupBy::Region => &self.region_rollups,
            GroupBy::Total => &[],
        }
    }
}

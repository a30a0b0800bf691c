//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation, fitting and forecasting
//! - exported to JSON/CSV
//! - handed to chart/dashboard collaborators as read-only views

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One transaction-level record as supplied by a record source.
///
/// `sales` is the forecast target and must be present by the time the
/// aggregator sees it. `profit` and `quantity` are accompanying metrics and
/// count as zero when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub order_date: NaiveDate,
    pub sales: Option<f64>,
    pub profit: Option<f64>,
    pub quantity: Option<f64>,
    pub category: Option<String>,
    pub region: Option<String>,
}

impl SalesRecord {
    /// Label of this record along a grouping dimension (`None` for `Total`).
    pub fn key(&self, by: GroupBy) -> Option<&str> {
        match by {
            GroupBy::Total => None,
            GroupBy::Category => self.category.as_deref(),
            GroupBy::Region => self.region.as_deref(),
        }
    }
}

/// Grouping dimension for series and rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Total,
    Category,
    Region,
}

impl GroupBy {
    /// Column header used for this dimension in exports.
    pub fn label(self) -> &'static str {
        match self {
            GroupBy::Total => "Total",
            GroupBy::Category => "Category",
            GroupBy::Region => "Region",
        }
    }
}

/// One aggregated day of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    /// Target metric (sales) summed over the day.
    pub value: f64,
    pub profit: f64,
    pub quantity: f64,
    pub group: Option<String>,
}

/// Ordered daily series for one group key (or the unqualified total).
///
/// Dates are strictly increasing and unique. The aggregator is the only
/// producer; consumers only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub group: Option<String>,
    pub observations: Vec<DailyObservation>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    /// The historical cutoff: last observed date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn total(&self) -> f64 {
        self.observations.iter().map(|o| o.value).sum()
    }

    pub fn mean(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        self.total() / self.observations.len() as f64
    }

    /// Look up the observed value for a date (binary search; dates are sorted).
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| self.observations[i].value)
    }

    pub fn label(&self) -> &str {
        self.group.as_deref().unwrap_or("Total")
    }
}

/// How seasonal and holiday components combine with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// `y = g + s + h`
    Additive,
    /// `y = g * (1 + s + h)`
    Multiplicative,
}

/// A calendar event whose effect is fitted as a fixed offset.
///
/// The effect applies on `date` and on every day within `window` days of it
/// (symmetric). Holidays sharing a `label` share one fitted effect, but each
/// keeps its own window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub label: String,
    pub window: u32,
}

/// Options for `fit`.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    pub daily_seasonality: bool,
    pub seasonality_mode: SeasonalityMode,
    /// Prior scale on trend rate changes (larger = more flexible trend).
    pub changepoint_flexibility: f64,
    /// Number of automatically placed changepoints.
    pub n_changepoints: usize,
    /// Fraction of the history eligible for automatic changepoints.
    pub changepoint_range: f64,
    /// Manual changepoint dates (overrides automatic placement).
    pub changepoints: Option<Vec<NaiveDate>>,
    pub yearly_order: usize,
    pub weekly_order: usize,
    pub seasonality_prior_scale: f64,
    pub holiday_prior_scale: f64,
    pub holidays: Vec<Holiday>,
    /// Iteration cap for the alternating multiplicative solve.
    pub max_iterations: usize,
    /// Relative objective change that counts as converged.
    pub tolerance: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            yearly_seasonality: true,
            weekly_seasonality: true,
            daily_seasonality: false,
            seasonality_mode: SeasonalityMode::Multiplicative,
            changepoint_flexibility: 0.05,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoints: None,
            yearly_order: 10,
            weekly_order: 3,
            seasonality_prior_scale: 10.0,
            holiday_prior_scale: 10.0,
            holidays: Vec::new(),
            max_iterations: 200,
            tolerance: 1e-6,
        }
    }
}

/// A trend changepoint with its fitted rate change (scaled units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changepoint {
    pub date: NaiveDate,
    pub t: f64,
    pub delta: f64,
}

/// Piecewise-linear trend: `g(t) = (k + Σ δ_j a_j(t)) t + (m - Σ δ_j s_j a_j(t))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    pub k: f64,
    pub m: f64,
    pub changepoints: Vec<Changepoint>,
}

/// A fitted truncated Fourier series.
///
/// `coefficients` are laid out `[sin_1, cos_1, sin_2, cos_2, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalComponent {
    pub name: String,
    pub period: f64,
    pub order: usize,
    pub coefficients: Vec<f64>,
}

/// One occurrence of a holiday with its own effect window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HolidayDate {
    pub date: NaiveDate,
    pub window: u32,
}

impl HolidayDate {
    /// Whether `day` lies within `window` days of this occurrence.
    pub fn covers(&self, day: NaiveDate) -> bool {
        (day - self.date).num_days().abs() <= i64::from(self.window)
    }
}

/// A fitted holiday offset shared by every occurrence of `label`.
///
/// Occurrences keep the window they were declared with, so one label may mix
/// single-day and multi-day effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayEffect {
    pub label: String,
    pub dates: Vec<HolidayDate>,
    pub effect: f64,
}

/// Fitted model state for one series.
///
/// All coefficients are in scaled units: `y / y_scale` and
/// `t = days_since(first_date) / span_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub group: Option<String>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub span_days: f64,
    pub y_scale: f64,
    pub mode: SeasonalityMode,
    pub trend: TrendParams,
    pub seasonalities: Vec<SeasonalComponent>,
    pub holidays: Vec<HolidayEffect>,
    /// Residual noise scale (scaled units).
    pub sigma: f64,
    pub n_obs: usize,
    pub iterations: usize,
    pub history: Series,
}

/// Decomposition of the model at one date (original units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Components {
    pub trend: f64,
    pub seasonal: f64,
    pub holiday: f64,
    pub yhat: f64,
}

/// A forecast value for one date with its prediction interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub trend: f64,
    pub seasonal: f64,
    pub holiday: f64,
}

impl ForecastPoint {
    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    pub fn is_future(&self, cutoff: NaiveDate) -> bool {
        self.date > cutoff
    }
}

/// Options for `predict`.
#[derive(Debug, Clone)]
pub struct ForecastOptions {
    /// Central probability mass of the interval (0.80 => 10th/90th percentiles).
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            interval_width: 0.80,
            uncertainty_samples: 1000,
            seed: 42,
        }
    }
}

/// Average daily forecast for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub period: String,
    pub mean_point_estimate: f64,
    pub mean_lower_bound: f64,
    pub mean_upper_bound: f64,
    pub days: usize,
}

/// Historical average daily value for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyHistory {
    pub year: i32,
    pub month: u32,
    pub mean_daily_value: f64,
    pub days: usize,
}

/// Sum/mean rollup of raw records for one category or region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub key: String,
    pub sum_value: f64,
    pub mean_value: f64,
    pub sum_profit: f64,
    pub mean_profit: f64,
    pub sum_quantity: f64,
    pub mean_quantity: f64,
    pub count: usize,
    /// Fraction of total sales across all keys (for proportion charts).
    pub share_of_value: f64,
}

/// In-sample accuracy of a forecast against its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    pub mae: f64,
    /// Mean absolute percentage error in percent; `None` when undefined.
    pub mape: Option<f64>,
    pub n: usize,
}

/// Holiday calendar to feed the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HolidayCalendar {
    None,
    Us,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub input: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub horizon_days: usize,
    pub model: ModelOptions,
    pub forecast: ForecastOptions,
    pub holiday_calendar: HolidayCalendar,
    pub holiday_window: u32,
    /// Dimensions to forecast per key (in addition to the total).
    pub group_forecasts: Vec<GroupBy>,
    /// Keys with this many aggregated days or fewer are skipped.
    pub min_group_days: usize,
    pub skip_invalid: bool,
}

/// English three-letter month abbreviation.
pub fn month_abbr(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES
        .get((month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("???")
}

/// `(year, month)` key of a date.
pub fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

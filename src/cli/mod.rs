//! Command-line parsing for the sales forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.
//!
//! Defaults can also come from the environment (or a `.env` file):
//! `SF_INPUT`, `SF_OUTPUT_DIR`, `SF_HORIZON`, `SF_LOG`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{GroupBy, HolidayCalendar, SeasonalityMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sf", version, about = "Daily sales forecasting with trend, seasonality and holiday effects")]
pub struct Cli {
    /// Log filter (e.g. `info`, `debug`, `sales_forecast=trace`). Overrides `RUST_LOG`.
    #[arg(long, global = true, env = "SF_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the model, forecast the horizon, print a summary and write exports.
    Forecast(ForecastArgs),
    /// Forecast from a saved `model.json` without refitting.
    Predict(PredictArgs),
    /// Print category/region rollups only (no model fit).
    Rollup(RollupArgs),
    /// Write a synthetic Superstore-like dataset.
    Sample(SampleArgs),
}

/// Options for `sf forecast`.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Transaction CSV (needs `Order Date` and `Sales` columns).
    #[arg(short, long, env = "SF_INPUT", value_name = "CSV")]
    pub input: PathBuf,

    /// Directory for CSV/JSON exports (created if missing). No exports when omitted.
    #[arg(short, long, env = "SF_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Days to forecast past the last historical date.
    #[arg(long, env = "SF_HORIZON", default_value_t = 90)]
    pub horizon: usize,

    /// How seasonal/holiday effects combine with the trend.
    #[arg(long, value_enum, default_value_t = SeasonalityMode::Multiplicative)]
    pub mode: SeasonalityMode,

    /// Disable the yearly component.
    #[arg(long)]
    pub no_yearly: bool,

    /// Disable the weekly component.
    #[arg(long)]
    pub no_weekly: bool,

    /// Request a daily component (dropped with a warning on daily data).
    #[arg(long)]
    pub daily: bool,

    /// Trend flexibility (prior scale on rate changes).
    #[arg(long, default_value_t = 0.05)]
    pub changepoint_flexibility: f64,

    /// Number of automatically placed changepoints.
    #[arg(long, default_value_t = 25)]
    pub n_changepoints: usize,

    /// Fraction of the history eligible for automatic changepoints.
    #[arg(long, default_value_t = 0.8)]
    pub changepoint_range: f64,

    /// Manual changepoint dates (YYYY-MM-DD); repeat or comma-separate.
    #[arg(long = "changepoint", value_delimiter = ',', value_name = "DATE")]
    pub changepoints: Vec<NaiveDate>,

    /// Fourier order of the yearly component.
    #[arg(long, default_value_t = 10)]
    pub yearly_order: usize,

    /// Fourier order of the weekly component.
    #[arg(long, default_value_t = 3)]
    pub weekly_order: usize,

    /// Prior scale on seasonal coefficients.
    #[arg(long, default_value_t = 10.0)]
    pub seasonality_prior_scale: f64,

    /// Prior scale on holiday effects.
    #[arg(long, default_value_t = 10.0)]
    pub holiday_prior_scale: f64,

    /// Holiday calendar to include.
    #[arg(long, value_enum, default_value_t = HolidayCalendar::None)]
    pub holidays: HolidayCalendar,

    /// Days on each side of a holiday that share its effect.
    #[arg(long, default_value_t = 0)]
    pub holiday_window: u32,

    /// Central probability mass of the prediction interval.
    #[arg(long, default_value_t = 0.80)]
    pub interval_width: f64,

    /// Monte Carlo paths used for future intervals.
    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    /// Random seed for interval simulation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Dimensions to forecast per key; repeat or comma-separate.
    #[arg(long = "group-by", value_enum, value_delimiter = ',', default_values_t = [GroupBy::Category])]
    pub group_by: Vec<GroupBy>,

    /// Keys with this many aggregated days or fewer are skipped.
    #[arg(long, default_value_t = 30)]
    pub min_group_days: usize,

    /// Skip unparseable rows instead of failing on the first one.
    #[arg(long)]
    pub skip_invalid: bool,

    /// Maximum iterations of the alternating multiplicative solve.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,
}

/// Options for `sf predict`.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Model JSON written by `sf forecast --output-dir`.
    #[arg(short, long, env = "SF_MODEL", value_name = "JSON")]
    pub model: PathBuf,

    /// Days to forecast past the model's last historical date.
    #[arg(long, env = "SF_HORIZON", default_value_t = 90)]
    pub horizon: usize,

    /// Central probability mass of the prediction interval.
    #[arg(long, default_value_t = 0.80)]
    pub interval_width: f64,

    /// Monte Carlo paths used for future intervals.
    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    /// Random seed for interval simulation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// CSV for the future points (`ds,yhat,yhat_lower,yhat_upper`).
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for `sf rollup`.
#[derive(Debug, Args, Clone)]
pub struct RollupArgs {
    /// Transaction CSV.
    #[arg(short, long, env = "SF_INPUT", value_name = "CSV")]
    pub input: PathBuf,

    /// Dimension(s) to roll up; repeat or comma-separate.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [GroupBy::Category, GroupBy::Region])]
    pub by: Vec<GroupBy>,

    /// Directory for `category_analysis.csv` / `regional_analysis.csv`.
    #[arg(short, long, env = "SF_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Skip unparseable rows instead of failing on the first one.
    #[arg(long)]
    pub skip_invalid: bool,
}

/// Options for `sf sample`.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short, long, value_name = "CSV", default_value = "data/superstore_sales.csv")]
    pub output: PathBuf,

    /// First order date.
    #[arg(long, default_value = "2021-01-01")]
    pub start: NaiveDate,

    /// Last order date.
    #[arg(long, default_value = "2024-12-31")]
    pub end: NaiveDate,

    /// Records generated per calendar day in the range.
    #[arg(long, default_value_t = 3)]
    pub records_per_day: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn forecast_defaults() {
        let cli = Cli::parse_from(["sf", "forecast", "--input", "sales.csv"]);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.horizon, 90);
        assert_eq!(args.mode, SeasonalityMode::Multiplicative);
        assert_eq!(args.group_by, vec![GroupBy::Category]);
        assert!(args.changepoints.is_empty());
        assert!((args.interval_width - 0.80).abs() < 1e-12);
    }

    #[test]
    fn list_flags_accept_commas() {
        let cli = Cli::parse_from([
            "sf",
            "forecast",
            "-i",
            "sales.csv",
            "--group-by",
            "category,region",
            "--changepoint",
            "2024-03-01,2024-06-01",
        ]);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.group_by, vec![GroupBy::Category, GroupBy::Region]);
        assert_eq!(args.changepoints.len(), 2);
    }

    #[test]
    fn predict_takes_a_model_path() {
        let cli = Cli::parse_from(["sf", "predict", "-m", "out/model.json", "--horizon", "14"]);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.model, PathBuf::from("out/model.json"));
        assert_eq!(args.horizon, 14);
        assert!(args.output.is_none());
    }
}

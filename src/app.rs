//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initialises logging
//! - runs the forecast pipeline or a standalone rollup
//! - prints reports and writes exports

use std::path::Path;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, ForecastArgs, PredictArgs, RollupArgs, SampleArgs};
use crate::data::{SampleConfig, generate_superstore, write_sample_csv};
use crate::domain::{ForecastConfig, ForecastOptions, GroupBy, ModelOptions};
use crate::error::AppError;
use crate::io::ingest::load_records;
use crate::report::{format_group_outcomes, format_monthly, format_rollups, format_row_errors, format_run_summary};
use crate::summary::rollup;

pub mod pipeline;

/// Row errors listed before the remainder is summarized.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Entry point for the `sf` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; values then come from the real environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init(cli.log_level.as_deref());

    match cli.command {
        Command::Forecast(args) => handle_forecast(args),
        Command::Predict(args) => handle_predict(args),
        Command::Rollup(args) => handle_rollup(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let config = forecast_config_from_args(&args);
    let run = pipeline::run_forecast(&config)?;
    let bundle = &run.bundle;

    print!("{}", format_row_errors(&run.ingest.row_errors, MAX_ROW_ERRORS_SHOWN));
    println!("{}", format_run_summary(bundle));
    println!("{}", format_monthly(bundle.monthly()));
    println!("{}", format_rollups(bundle.rollups(GroupBy::Category), GroupBy::Category));
    println!("{}", format_rollups(bundle.rollups(GroupBy::Region), GroupBy::Region));
    print!("{}", format_group_outcomes(bundle));

    if let Some(dir) = &config.output_dir {
        let written = crate::io::export::write_all(dir, bundle)?;
        info!(dir = %dir.display(), files = written.len(), "exports written");
        for path in written {
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let opts = ForecastOptions {
        interval_width: args.interval_width,
        uncertainty_samples: args.samples,
        seed: args.seed,
    };
    let run = pipeline::forecast_saved_model(&args.model, args.horizon, &opts)?;

    println!(
        "Model for {} (history {} .. {}, {} days ahead)",
        run.model.history.label(),
        run.model.first_date,
        run.model.last_date,
        args.horizon
    );
    println!("{}", format_monthly(&run.monthly));

    if let Some(path) = &args.output {
        let future: Vec<_> = run.points.iter().filter(|p| p.date > run.model.last_date).cloned().collect();
        crate::io::export::write_group_csv(path, &future)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn handle_rollup(args: RollupArgs) -> Result<(), AppError> {
    let ingest = load_records(&args.input, args.skip_invalid)?;
    print!("{}", format_row_errors(&ingest.row_errors, MAX_ROW_ERRORS_SHOWN));

    for by in &args.by {
        let rows = rollup(&ingest.records, *by);
        println!("{}", format_rollups(&rows, *by));

        if let Some(dir) = &args.output_dir {
            let file = match by {
                GroupBy::Category => "category_analysis.csv",
                GroupBy::Region => "regional_analysis.csv",
                GroupBy::Total => "total_analysis.csv",
            };
            write_rollup_into(dir, file, &rows, *by)?;
        }
    }
    Ok(())
}

fn write_rollup_into(dir: &Path, file: &str, rows: &[crate::domain::Rollup], by: GroupBy) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;
    let path = dir.join(file);
    crate::io::export::write_rollup_csv(&path, rows, by)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        start: args.start,
        end: args.end,
        records_per_day: args.records_per_day,
        seed: args.seed,
    };
    let records = generate_superstore(&config)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    write_sample_csv(&args.output, &records)?;

    info!(records = records.len(), path = %args.output.display(), "sample dataset written");
    println!(
        "wrote {} records ({} .. {}) to {}",
        records.len(),
        config.start,
        config.end,
        args.output.display()
    );
    Ok(())
}

pub fn forecast_config_from_args(args: &ForecastArgs) -> ForecastConfig {
    let model = ModelOptions {
        yearly_seasonality: !args.no_yearly,
        weekly_seasonality: !args.no_weekly,
        daily_seasonality: args.daily,
        seasonality_mode: args.mode,
        changepoint_flexibility: args.changepoint_flexibility,
        n_changepoints: args.n_changepoints,
        changepoint_range: args.changepoint_range,
        changepoints: (!args.changepoints.is_empty()).then(|| args.changepoints.clone()),
        yearly_order: args.yearly_order,
        weekly_order: args.weekly_order,
        seasonality_prior_scale: args.seasonality_prior_scale,
        holiday_prior_scale: args.holiday_prior_scale,
        max_iterations: args.max_iterations,
        ..ModelOptions::default()
    };

    ForecastConfig {
        input: args.input.clone(),
        output_dir: args.output_dir.clone(),
        horizon_days: args.horizon,
        model,
        forecast: ForecastOptions {
            interval_width: args.interval_width,
            uncertainty_samples: args.samples,
            seed: args.seed,
        },
        holiday_calendar: args.holidays,
        holiday_window: args.holiday_window,
        group_forecasts: args.group_by.clone(),
        min_group_days: args.min_group_days,
        skip_invalid: args.skip_invalid,
    }
}

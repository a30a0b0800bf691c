//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw input records and grouping (`SalesRecord`, `GroupBy`)
//! - aggregated series (`DailyObservation`, `Series`)
//! - model state and outputs (`FittedModel`, `ForecastPoint`, `MonthlySummary`, `Rollup`)

pub mod types;

pub use types::*;

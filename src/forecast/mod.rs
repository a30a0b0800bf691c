//! Forecasting from a fitted model.
//!
//! - `predictor`: point estimates and interval bounds over history + horizon
//! - `simulate`: seeded Monte Carlo trend paths (parallel over paths)

pub mod predictor;
pub mod simulate;

pub use predictor::*;

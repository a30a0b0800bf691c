//! Seasonal-trend model evaluation.
//!
//! Components are implemented as small, pure functions so that fitting and
//! forecasting code can share them.

pub mod model;

pub use model::*;

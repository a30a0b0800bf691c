//! Multi-resolution summaries.
//!
//! - monthly averages of the daily forecast (future range only)
//! - category/region rollups of raw records
//! - in-sample accuracy (MAE/MAPE)

pub mod accuracy;
pub mod monthly;
pub mod rollup;

pub use accuracy::*;
pub use monthly::*;
pub use rollup::*;

//! Transaction records -> ordered daily series.
//!
//! - overall series and single-key series (`aggregate`)
//! - one series per category/region key (`aggregate_groups`)
//! - historical monthly averages of daily totals (`aggregate_monthly`)

pub mod daily;

pub use daily::*;

//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - CSV exports of a report bundle (`export`)
//! - model and summary JSON read/write (`model`)

pub mod export;
pub mod ingest;
pub mod model;

pub use export::*;
pub use ingest::*;
pub use model::*;

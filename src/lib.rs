//! `sales-forecast` library crate.
//!
//! The binary (`sf`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine is reusable by other front-ends (dashboards, notebooks, etc.)
//!
//! Flow: records -> `aggregate` -> `fit` -> `forecast` -> `summary` -> `report`.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
pub mod summary;

//! Model fitting.
//!
//! Responsibilities:
//!
//! - place trend changepoints (automatic or manual)
//! - decide which seasonal and holiday blocks the history can support
//! - solve the penalized least squares problem (joint or alternating)

pub mod changepoints;
pub mod fitter;

pub use changepoints::*;
pub use fitter::*;

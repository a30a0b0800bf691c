//! Data providers.
//!
//! - holiday calendars (`holidays`)
//! - synthetic Superstore-like records (`sample`)

pub mod holidays;
pub mod sample;

pub use holidays::*;
pub use sample::*;

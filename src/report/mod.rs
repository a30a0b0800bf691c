//! Reporting: typed result bundle and formatted terminal output.

pub mod bundle;
pub mod format;

pub use bundle::*;
pub use format::*;

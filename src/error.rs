//! Error types.
//!
//! Two layers:
//!
//! - `ForecastError`: the engine taxonomy (aggregation, fitting, metrics, schema).
//!   Library code returns this so callers can isolate failures per group key.
//! - `AppError`: the binary boundary. Carries a process exit code and a
//!   human-readable message.

use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised by the forecasting engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Fewer than two distinct dates remain after grouping.
    #[error("empty series{}: need at least 2 distinct dates, got {distinct_dates}", fmt_group(.group))]
    EmptySeries {
        group: Option<String>,
        distinct_dates: usize,
    },

    /// The optimizer did not produce stable parameters.
    #[error("fit diverged: {0}")]
    FitDivergence(String),

    /// A metric is mathematically undefined for the given inputs.
    #[error("undefined metric: {0}")]
    UndefinedMetric(String),

    /// A required field is missing or unparseable.
    #[error("schema error{}: {message}", fmt_line(.line))]
    Schema { line: Option<usize>, message: String },

    /// A model or forecast option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl ForecastError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            line: None,
            message: message.into(),
        }
    }

    pub fn schema_at(line: usize, message: impl Into<String>) -> Self {
        Self::Schema {
            line: Some(line),
            message: message.into(),
        }
    }

    /// Stable failure name used in per-group reports and exports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptySeries { .. } => "EmptySeriesError",
            Self::FitDivergence(_) => "FitDivergenceError",
            Self::UndefinedMetric(_) => "UndefinedMetricError",
            Self::Schema { .. } => "SchemaError",
            Self::InvalidOption(_) => "InvalidOptionError",
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Schema { .. } | Self::InvalidOption(_) => 2,
            Self::EmptySeries { .. } => 3,
            Self::FitDivergence(_) | Self::UndefinedMetric(_) => 4,
        }
    }
}

fn fmt_group(group: &Option<String>) -> String {
    group.as_ref().map(|g| format!(" for '{g}'")).unwrap_or_default()
}

fn fmt_line(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_group_and_line() {
        let err = ForecastError::EmptySeries {
            group: Some("Furniture".to_string()),
            distinct_dates: 1,
        };
        assert_eq!(
            err.to_string(),
            "empty series for 'Furniture': need at least 2 distinct dates, got 1"
        );

        let err = ForecastError::schema_at(7, "missing `sales`");
        assert_eq!(err.to_string(), "schema error (line 7): missing `sales`");
        assert_eq!(err.kind(), "SchemaError");
    }

    #[test]
    fn app_error_keeps_exit_code() {
        let app: AppError = ForecastError::FitDivergence("constant zero series".into()).into();
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().contains("constant zero series"));
    }
}

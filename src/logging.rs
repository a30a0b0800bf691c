//! Tracing subscriber setup.
//!
//! Logs go to stderr so the terminal report on stdout stays clean. The filter
//! comes from `--log-level` / `SF_LOG`, else `RUST_LOG`, else `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// Resolve the filter from an explicit directive or the environment.
pub fn resolve_filter(explicit: Option<&str>) -> EnvFilter {
    explicit
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(explicit: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(resolve_filter(explicit))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

//! Structured logging bootstrap for the demo binary.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a `tracing-subscriber` pipeline: env-filter driven level selection, JSON
/// output when `TASK_ENGINE_LOG_FORMAT=json`, human-readable otherwise.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_output = std::env::var("TASK_ENGINE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

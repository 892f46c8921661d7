//! Logging setup
//!
//! Diagnostics go to stderr so they never interleave with the progress lines
//! the indexer prints on stdout. Dependencies are held at `warn`; the level
//! chosen by `--log` or `core.log_level` applies to the indexer itself.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber for `log_level`, unless `RUST_LOG` is set
///
/// Debug builds print human-readable events; release builds emit one JSON
/// object per event for log collectors. A second call is a no-op.
pub fn init_telemetry_with_level(log_level: &str) {
    let default_filter = format!("warn,plugin_indexer={}", log_level);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

/// Logging for failures that happen before the configuration is loaded
pub fn init_telemetry() {
    init_telemetry_with_level("info");
}

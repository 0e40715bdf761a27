//! Logging configuration using tracing
//!
//! Logs go to stderr so they never mix with command output on stdout.
//! Access and refresh tokens are never logged; request logs carry the
//! method, path and status only.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn";

/// Filter used by `--verbose` when `RUST_LOG` is unset
pub const VERBOSE_FILTER: &str = "warn,storefront=debug";

/// Initialize the tracing subscriber with the default filter
///
/// # Example RUST_LOG values
/// - `RUST_LOG=info` - Show info and above
/// - `RUST_LOG=storefront=debug` - Debug level for the storefront crate
/// - `RUST_LOG=storefront::client=trace,reqwest=info` - Per-module levels
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init() -> crate::Result<()> {
    init_with_default(DEFAULT_FILTER)
}

/// Initialize the tracing subscriber, falling back to `default_filter`
/// when `RUST_LOG` is unset or invalid
pub fn init_with_default(default_filter: &str) -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .pretty(),
        )
        .try_init()
        .map_err(|e| {
            crate::StorefrontError::Other(format!("Failed to initialize tracing: {}", e))
        })
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init_with_default("debug");
}

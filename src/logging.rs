//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout carries only the report and plots.

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` wins; otherwise `info`.
///
/// Calling this twice is harmless (the second install is ignored), which keeps
/// tests that run the full app from tripping over each other.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init();
}

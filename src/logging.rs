//! Tracing setup for the squad binary.
//!
//! Logs always go to stderr: stdout carries protocol responses and command
//! output.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug { "info,squad=debug" } else { "info" }
}

/// Install the global subscriber. Later calls are ignored.
///
/// `RUST_LOG` wins when set; otherwise `debug` lowers the crate to debug level.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

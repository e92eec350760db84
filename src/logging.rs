//! Logging setup
//!
//! Diagnostics go to stderr so stdout stays clean for piping. `RUST_LOG`
//! takes precedence over the verbosity flag.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for a `-v` count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber for the binary
///
/// # Environment
/// - `RUST_LOG`: filter directives, e.g. `RUST_LOG=ato::core::stability=debug`
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .without_time()
        .try_init();
}

/// Install a test-captured subscriber; repeated calls are no-ops
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

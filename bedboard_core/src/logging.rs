//! Tracing setup for the bedboard binary.
//!
//! Diagnostics go to stderr so roster and report output on stdout stays
//! machine-readable. `RUST_LOG` overrides the verbosity chosen on the
//! command line.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level for a `-v` count: warnings only by default, then placement
/// decisions, then store and journal detail.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the stderr subscriber for the given `-v` count
pub fn init(verbosity: u8) {
    init_with_level(level_for_verbosity(verbosity))
}

/// Install the stderr subscriber with `default_level` unless `RUST_LOG` is set
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .init();
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

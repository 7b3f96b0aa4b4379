//! Tracing subscriber setup for the binary.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber, writing to stderr.
///
/// `-v` flags take priority; without them `RUST_LOG` is honored, and the
/// default is warnings only. Calling this more than once has no effect.
pub fn init(verbosity: u8) {
    TRACING_INIT.call_once(|| {
        let filter = if verbosity > 0 {
            EnvFilter::new(level_for(verbosity))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(0)))
        };

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_level(true),
            )
            .with(filter)
            .init();
    });
}

//! Tracing setup for the binary.
//!
//! `LEGACYMAP_LOG` takes a regular `EnvFilter` directive such as
//! `legacymap=debug` or `legacymap::database=trace`. Without it the level
//! follows the `-v` count. Logs go to stderr so that `--output -` stays
//! clean.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "LEGACYMAP_LOG";

static INIT: Once = Once::new();

/// Default directive for a `-v` count.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: u8) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbosity >= 2)
                    .with_thread_ids(verbosity >= 3),
            )
            .with(filter)
            .init();
    });
}

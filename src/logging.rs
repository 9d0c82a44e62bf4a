//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "LINKGRAPH_LOG";

/// Filter used when `LINKGRAPH_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "linkgraph=info";

/// Install the global subscriber.
///
/// Reads `LINKGRAPH_LOG` for per-module levels, e.g.
/// `LINKGRAPH_LOG=linkgraph::suggestion=debug,linkgraph=info`.
/// Output goes to stderr. Calling this more than once is harmless, and a
/// subscriber already installed by the host process is left in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod logging_tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber installed");
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}

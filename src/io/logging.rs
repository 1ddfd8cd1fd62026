//! Tracing subscriber setup for the command-line tool

use crate::io::configuration::{DEFAULT_LOG_FILTER, LOG_ENV_VAR};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How much the tool reports while running
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Batch lifecycle and results
    #[default]
    Normal,
    /// Per-task dispatch details
    Verbose,
}

/// Filter directive for `verbosity`, unless `override_directive` is given
///
/// A non-blank override (normally the `MULTIVERSE_LOG` environment variable)
/// always wins.
pub fn filter_directive(verbosity: Verbosity, override_directive: Option<&str>) -> String {
    if let Some(directive) = override_directive.map(str::trim)
        && !directive.is_empty()
    {
        return directive.to_string();
    }
    match verbosity {
        Verbosity::Quiet => "multiverse=warn".to_string(),
        Verbosity::Normal => DEFAULT_LOG_FILTER.to_string(),
        Verbosity::Verbose => "multiverse=debug".to_string(),
    }
}

/// Install the global subscriber writing to stderr
///
/// Returns `false` if a subscriber was already installed.
pub fn init(verbosity: Verbosity) -> bool {
    let from_env = std::env::var(LOG_ENV_VAR).ok();
    let directive = filter_directive(verbosity, from_env.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}

//! Diagnostic output on stderr.

use std::env;
use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::AppError;

/// Overrides the `-v` count when set.
pub const LOG_ENV_VAR: &str = "AGSYNC_LOG";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: u8) -> Result<(), AppError> {
    let filter = build_filter(env::var(LOG_ENV_VAR).ok().as_deref(), verbosity)?;
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(false);

    // A subscriber installed by an embedding program takes precedence.
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
    Ok(())
}

fn build_filter(spec: Option<&str>, verbosity: u8) -> Result<EnvFilter, AppError> {
    if let Some(spec) = spec.filter(|spec| !spec.trim().is_empty()) {
        return EnvFilter::try_new(spec).map_err(|e| {
            AppError::config_error(format!("Invalid {} filter '{}': {}", LOG_ENV_VAR, spec, e))
        });
    }

    EnvFilter::try_new(default_directive(verbosity))
        .map_err(|e| AppError::Internal(format!("Invalid default log filter: {}", e)))
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "agsync=warn",
        1 => "agsync=info",
        2 => "agsync=debug",
        _ => "agsync=trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_level() {
        assert_eq!(default_directive(0), "agsync=warn");
        assert_eq!(default_directive(1), "agsync=info");
        assert_eq!(default_directive(9), "agsync=trace");
    }

    #[test]
    fn every_filter_source_parses() {
        for verbosity in 0..4 {
            assert!(build_filter(None, verbosity).is_ok());
        }
        assert!(build_filter(Some("debug"), 0).is_ok());
        assert!(build_filter(Some("  "), 1).is_ok());
    }
}

//! Structured tracing helpers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before the configured filter.
pub const LOG_ENV_VAR: &str = "HITL_LOG";

const DEFAULT_FILTER: &str = "info";

/// Settings for the process-wide `tracing` subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info,hitl_kernel=debug`.
    pub filter: String,
    /// Emit ANSI colour codes.
    pub ansi: bool,
    /// Include the event target (module path) in each line.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            ansi: true,
            with_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Returns a config using the supplied filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|err| TelemetryError::InvalidFilter {
            filter: self.filter.clone(),
            reason: err.to_string(),
        })
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialised(String),
}

/// Installs a formatted subscriber honouring [`LOG_ENV_VAR`]. Output goes to
/// stderr so stdout stays free for command results.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is malformed or when a global
/// subscriber was installed earlier in the process.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialised(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter() {
        let config = TelemetryConfig::default().with_filter("hitl=verbose");
        // Only meaningful when the env override is absent.
        if std::env::var(LOG_ENV_VAR).is_err() {
            assert!(matches!(
                config.env_filter(),
                Err(TelemetryError::InvalidFilter { .. })
            ));
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"filter": "debug"}"#).expect("parse");
        assert_eq!(config.filter, "debug");
        assert!(config.ansi);
        assert!(!config.with_target);
    }
}

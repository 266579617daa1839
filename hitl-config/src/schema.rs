//! On-disk configuration shapes.

use std::path::PathBuf;

use hitl_policy::{PolicyBook, PolicyConfig};
use hitl_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Policy file: a version number and one policy per agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyFile {
    /// Version stamped onto every decision made with this file.
    #[serde(default)]
    pub version: u64,
    /// Agent policies.
    pub agents: Vec<PolicyConfig>,
}

impl PolicyFile {
    /// Exports a book, e.g. to seed a file from the built-in policies.
    #[must_use]
    pub fn from_book(book: &PolicyBook) -> Self {
        Self {
            version: book.version(),
            agents: book.policies().map(|policy| policy.as_ref().clone()).collect(),
        }
    }

    /// Validates every policy and builds the book.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPolicy`](crate::ConfigError::InvalidPolicy)
    /// for the first invalid policy or a duplicated agent.
    pub fn into_book(self) -> ConfigResult<PolicyBook> {
        Ok(PolicyBook::from_policies(self.version, self.agents)?)
    }
}

/// Process-level settings for binaries embedding the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Policy file; the built-in policies are used when absent.
    pub policy_path: Option<PathBuf>,
    /// Kill switch file. A missing file means everything is enabled.
    pub kill_switch_path: PathBuf,
    /// Feedback JSONL journal.
    pub feedback_path: PathBuf,
    /// Decision audit JSONL journal; auditing is off when absent.
    pub audit_path: Option<PathBuf>,
    /// Concurrency limit for batch runs.
    pub max_concurrency: usize,
    /// Logging setup.
    pub telemetry: TelemetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            policy_path: None,
            kill_switch_path: PathBuf::from("kill_switch.json"),
            feedback_path: PathBuf::from("feedback.jsonl"),
            audit_path: None,
            max_concurrency: 32,
            telemetry: TelemetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_config_fills_defaults() {
        let config: RuntimeConfig = serde_json::from_str(
            r#"{"audit_path": "audit.jsonl", "telemetry": {"filter": "debug"}}"#,
        )
        .expect("parse");
        assert_eq!(config.kill_switch_path, PathBuf::from("kill_switch.json"));
        assert_eq!(config.audit_path, Some(PathBuf::from("audit.jsonl")));
        assert_eq!(config.telemetry.filter, "debug");
        assert!(config.telemetry.ansi);
        assert_eq!(config.max_concurrency, 32);
    }
}

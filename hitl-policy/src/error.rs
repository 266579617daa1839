//! Error types for policy construction and validation.

use hitl_primitives::AgentId;
use thiserror::Error;

/// Errors surfaced while building or validating policies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// A score declaration is malformed.
    #[error("agent {agent}: invalid score `{score}`: {reason}")]
    InvalidScore {
        /// Owning agent.
        agent: AgentId,
        /// Score name as declared.
        score: String,
        /// Human-readable explanation.
        reason: String,
    },
    /// A threshold rule is malformed or references unknown entities.
    #[error("agent {agent}: invalid rule `{rule}`: {reason}")]
    InvalidRule {
        /// Owning agent.
        agent: AgentId,
        /// Rule name as declared.
        rule: String,
        /// Human-readable explanation.
        reason: String,
    },
    /// The action catalog is malformed.
    #[error("agent {agent}: invalid action catalog: {reason}")]
    InvalidCatalog {
        /// Owning agent.
        agent: AgentId,
        /// Human-readable explanation.
        reason: String,
    },
    /// Two policies were registered for the same agent.
    #[error("duplicate policy for agent {0}")]
    DuplicateAgent(AgentId),
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

//! Shared error definitions for decision primitives.

use thiserror::Error;

/// Result alias used throughout the decision engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Agent identifier failed validation.
    #[error("invalid agent id `{id}`: {reason}")]
    InvalidAgentId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Signal name failed validation.
    #[error("invalid signal name `{name}`: {reason}")]
    InvalidSignalName {
        /// The offending signal name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

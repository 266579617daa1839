//! Core shared types for the human-in-the-loop decision engine.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod signals;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier of a calling agent (negotiator, retention, sales coach, ...).
pub use ids::AgentId;
/// Normalised signals handed in by upstream extraction.
pub use signals::{SignalSet, SignalValue};

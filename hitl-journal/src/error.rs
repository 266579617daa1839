//! Error types for journals.

use serde_json::Error as SerdeError;
use thiserror::Error;

/// Errors emitted by journals.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying I/O failure while reading or writing journal files.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },
    /// Serialization or deserialization error.
    #[error("serialization error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: SerdeError,
    },
    /// A feedback outcome label was not recognised.
    #[error("unknown feedback outcome `{0}` (expected accepted|ignored|edited)")]
    UnknownOutcome(String),
    /// A stored line could not be decoded.
    #[error("corrupt journal entry on line {line}: {source}")]
    CorruptEntry {
        /// One-based line number.
        line: usize,
        /// Decoder error.
        #[source]
        source: SerdeError,
    },
}

/// Result type alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

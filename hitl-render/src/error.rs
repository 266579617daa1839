//! Error types for rendering.

use thiserror::Error;

/// Errors raised while preparing or rendering templates.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A placeholder had no value at render time.
    #[error("missing value for template variable `{name}`")]
    MissingVariable {
        /// Variable name.
        name: String,
    },
    /// A template refers to a variable the renderer never provides.
    #[error("template refers to unknown variable `{name}`")]
    UnknownVariable {
        /// Variable name.
        name: String,
    },
}

/// Result alias for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

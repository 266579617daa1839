//! Configuration for the decision engine.
//!
//! Policy files are validated as a whole at load time so that malformed rules
//! never reach a decision cycle. The kill switch lives in a small JSON file
//! that administrators may edit by hand or through [`FileKillSwitch`].

#![warn(missing_docs, clippy::pedantic)]

pub mod defaults;
mod error;
pub mod loader;
pub mod schema;

pub use defaults::{
    BUILTIN_POLICY_VERSION, builtin_policies, builtin_policy_book, negotiator_policy,
    retention_policy, sales_coach_policy,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{
    FileKillSwitch, load_policy_book, load_policy_book_or_builtin, parse_policy_book, read_json,
    write_json_atomic,
};
pub use schema::{PolicyFile, RuntimeConfig};

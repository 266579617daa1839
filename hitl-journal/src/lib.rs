//! Append-only journals for the decision engine.
//!
//! Feedback events and decision records are written as newline-delimited
//! JSON so they can be tailed, shipped, or replayed without extra tooling.

#![warn(missing_docs, clippy::pedantic)]

pub mod audit;
mod error;
pub mod feedback;
pub mod journal;

pub use audit::{AuditJournal, FeedbackJournal};
pub use error::{JournalError, JournalResult};
pub use feedback::{FeedbackEvent, FeedbackOutcome, FeedbackTally};
pub use journal::{FileJournal, Journal};

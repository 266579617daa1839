//! Observability utilities for the decision engine.
//!
//! Two concerns live here: installing the process-wide `tracing` subscriber,
//! and the [`Diagnostic`] taxonomy used to report non-fatal anomalies that a
//! decision cycle absorbed instead of failing.

#![warn(missing_docs, clippy::pedantic)]

pub mod diagnostics;
pub mod tracing_support;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use tracing_support::{TelemetryConfig, TelemetryError, init_tracing};

//! Human-in-the-loop decision engine facade.
//!
//! Bundles the engine crates behind feature flags. Policy types, signals, and
//! diagnostics are always available; the kernel, configuration loading,
//! journals, and renderers can be switched off individually.

#![warn(missing_docs, clippy::pedantic)]

/// Agent ids, signals, and shared errors.
pub use hitl_primitives as primitives;

/// Tracing setup and the diagnostic taxonomy.
pub use hitl_telemetry as telemetry;

/// Policies, scoring, and routing.
pub use hitl_policy as policy;

/// Decision cycles, kill switch gate, and batch runs (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use hitl_kernel as kernel;

/// Policy files, built-in policies, and the file-backed kill switch (enabled by `config` feature).
#[cfg(feature = "config")]
pub use hitl_config as config;

/// Feedback and audit journals (enabled by `journal` feature).
#[cfg(feature = "journal")]
pub use hitl_journal as journal;

/// Cards, templates, and coaching tips (enabled by `render` feature).
#[cfg(feature = "render")]
pub use hitl_render as render;

//! Non-fatal anomalies recorded during a decision cycle.
//!
//! A cycle never aborts on bad input; it degrades and leaves a [`Diagnostic`]
//! behind. Every diagnostic is also emitted as a `tracing` event at the level
//! matching its kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Category of a recorded anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A value fell outside its declared domain and was clamped.
    SignalClamped,
    /// An expected signal was absent and contributed zero weight.
    SignalMissing,
    /// A signal was present but of the wrong kind or an unknown label.
    SignalUnusable,
    /// Score weights did not sum to 1.0 and were normalised.
    WeightsNormalized,
    /// Several rules of equal priority matched; resolved by tie-break.
    ConfigurationConflict,
    /// A matched rule was suppressed because confidence was too low.
    ConfidenceGate,
}

impl DiagnosticKind {
    /// Returns `true` for kinds that indicate a misconfiguration or bad input
    /// worth an operator's attention.
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(
            self,
            Self::SignalClamped | Self::SignalUnusable | Self::WeightsNormalized | Self::ConfigurationConflict
        )
    }

    /// Stable snake-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SignalClamped => "signal_clamped",
            Self::SignalMissing => "signal_missing",
            Self::SignalUnusable => "signal_unusable",
            Self::WeightsNormalized => "weights_normalized",
            Self::ConfigurationConflict => "configuration_conflict",
            Self::ConfidenceGate => "confidence_gate",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single recorded anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    subject: String,
    detail: String,
}

impl Diagnostic {
    /// Creates a diagnostic about `subject` (a signal, score, or rule name).
    #[must_use]
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }

    /// Returns the diagnostic kind.
    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// Returns the name of the signal, score, or rule concerned.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the human-readable detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.detail)
    }
}

/// Ordered collector of diagnostics for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and emits it through `tracing`.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind.is_warning() {
            warn!(
                kind = %diagnostic.kind,
                subject = %diagnostic.subject,
                "{}",
                diagnostic.detail
            );
        } else {
            debug!(
                kind = %diagnostic.kind,
                subject = %diagnostic.subject,
                "{}",
                diagnostic.detail
            );
        }
        self.entries.push(diagnostic);
    }

    /// Shorthand for [`Diagnostics::record`] with an inline diagnostic.
    pub fn push(&mut self, kind: DiagnosticKind, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(Diagnostic::new(kind, subject, detail));
    }

    /// Moves every entry of `other` into this collector without re-emitting.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Returns `true` if any diagnostic of `kind` was recorded.
    #[must_use]
    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    /// Returns the recorded diagnostics in order.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the collector, yielding the entries.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

//! Scores, actions, and the intermediate results of scoring and routing.

use std::collections::BTreeMap;
use std::fmt;

use hitl_telemetry::Diagnostics;
use serde::{Deserialize, Serialize};

/// Outcome offered to a human. Never executed by the engine itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing is surfaced.
    #[default]
    None,
    /// Show rubric scores with coaching tips.
    ScoreAndTips,
    /// Whisper a suggested response.
    Suggest,
    /// Alert the account owner for review.
    Alert,
    /// Prepare a draft message for human review.
    Draft,
}

impl Action {
    /// Urgency tier, higher is more urgent.
    #[must_use]
    pub const fn urgency(self) -> u8 {
        match self {
            Self::None => 0,
            Self::ScoreAndTips => 1,
            Self::Suggest => 2,
            Self::Alert => 3,
            Self::Draft => 4,
        }
    }

    /// Stable snake-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ScoreAndTips => "score_and_tips",
            Self::Suggest => "suggest",
            Self::Alert => "alert",
            Self::Draft => "draft",
        }
    }

    /// Returns `true` for [`Action::None`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Declared bounds of a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRange {
    /// Risk or probability style score in `[0, 1]`.
    #[default]
    Unit,
    /// Rubric style score in `[0, 100]`.
    Percent,
}

impl ScoreRange {
    /// Upper bound of the range; the lower bound is always zero.
    #[must_use]
    pub const fn upper(self) -> f64 {
        match self {
            Self::Unit => 1.0,
            Self::Percent => 100.0,
        }
    }

    /// Clamps `value` into the range. `NaN` maps to the lower bound.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(0.0, self.upper())
    }
}

/// Named numeric result, always within its declared range.
///
/// Deserialized values are clamped the same way computed ones are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredScore")]
pub struct Score {
    value: f64,
    range: ScoreRange,
}

#[derive(Deserialize)]
struct StoredScore {
    value: f64,
    range: ScoreRange,
}

impl From<StoredScore> for Score {
    fn from(stored: StoredScore) -> Self {
        Self::clamped(stored.range, stored.value).0
    }
}

impl Score {
    /// Builds a score, clamping into range. The second element carries the
    /// raw value when clamping changed it.
    #[must_use]
    pub fn clamped(range: ScoreRange, value: f64) -> (Self, Option<f64>) {
        let clamped = range.clamp(value);
        #[allow(clippy::float_cmp)]
        let changed = value.is_nan() || clamped != value;
        (
            Self {
                value: clamped,
                range,
            },
            changed.then_some(value),
        )
    }

    /// Returns the score value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the declared range.
    #[must_use]
    pub fn range(&self) -> ScoreRange {
        self.range
    }

    /// Value rescaled to `[0, 1]`.
    #[must_use]
    pub fn normalized(&self) -> f64 {
        self.value / self.range.upper()
    }
}

/// Output of [`ScoringEngine::score`](crate::ScoringEngine::score).
#[derive(Debug, Clone, Default)]
pub struct ScoreSheet {
    /// Every declared score, degraded to its default when inputs are missing.
    pub scores: BTreeMap<String, Score>,
    /// Self-reported certainty in `[0, 1]`.
    pub confidence: f64,
    /// Fraction of expected signals that were present and usable.
    pub coverage: f64,
    /// Consistency between redundant signals, `1.0` when nothing disagrees.
    pub agreement: f64,
    /// Score the reasons explain.
    pub dominant: Option<String>,
    /// Ordered, human-readable explanations.
    pub reasons: Vec<String>,
    /// Anomalies absorbed while scoring.
    pub diagnostics: Diagnostics,
}

/// Output of [`ActionRouter::route`](crate::ActionRouter::route).
#[derive(Debug, Clone, Default)]
pub struct RouteOutcome {
    /// Chosen action, [`Action::None`] when nothing qualified.
    pub action: Action,
    /// Name of the selected rule.
    pub rule: Option<String>,
    /// Ordered explanations of the routing step.
    pub reasons: Vec<String>,
    /// Anomalies absorbed while routing.
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_clamps_and_reports_raw_value() {
        let (score, raw) = Score::clamped(ScoreRange::Unit, 1.3);
        assert!((score.value() - 1.0).abs() < f64::EPSILON);
        assert_eq!(raw, Some(1.3));

        let (score, raw) = Score::clamped(ScoreRange::Percent, 42.0);
        assert!((score.value() - 42.0).abs() < f64::EPSILON);
        assert!(raw.is_none());
        assert!((score.normalized() - 0.42).abs() < 1e-12);
    }

    #[test]
    fn nan_scores_fall_to_lower_bound() {
        let (score, raw) = Score::clamped(ScoreRange::Unit, f64::NAN);
        assert!(score.value().abs() < f64::EPSILON);
        assert!(raw.is_some_and(f64::is_nan));
    }

    #[test]
    fn stored_scores_are_clamped_on_read() {
        let score: Score = serde_json::from_str(r#"{"value": 140.0, "range": "percent"}"#).unwrap();
        assert!((score.value() - 100.0).abs() < f64::EPSILON);

        let score: Score = serde_json::from_str(r#"{"value": -0.2, "range": "unit"}"#).unwrap();
        assert!(score.value().abs() < f64::EPSILON);
        assert_eq!(score.range(), ScoreRange::Unit);
    }

    #[test]
    fn actions_order_by_urgency() {
        let mut actions = vec![Action::Draft, Action::None, Action::Alert, Action::Suggest];
        actions.sort_by_key(|action| action.urgency());
        assert_eq!(actions, [Action::None, Action::Suggest, Action::Alert, Action::Draft]);
        assert_eq!(Action::ScoreAndTips.to_string(), "score_and_tips");
    }
}

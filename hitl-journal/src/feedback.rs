//! Human responses to surfaced decisions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use hitl_kernel::DecisionRecord;
use hitl_policy::Action;
use hitl_primitives::AgentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JournalError;

/// What the human did with a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// Acted on as recommended.
    Accepted,
    /// Dismissed.
    Ignored,
    /// Modified before acting.
    Edited,
}

impl FeedbackOutcome {
    /// Stable snake-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Ignored => "ignored",
            Self::Edited => "edited",
        }
    }
}

impl fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FeedbackOutcome {
    type Err = JournalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(Self::Accepted),
            "ignored" => Ok(Self::Ignored),
            "edited" => Ok(Self::Edited),
            other => Err(JournalError::UnknownOutcome(other.to_owned())),
        }
    }
}

/// One feedback entry as persisted in the feedback journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    event_id: Uuid,
    timestamp_utc: DateTime<Utc>,
    agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_id: Option<String>,
    recommended_action: Action,
    outcome: FeedbackOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(default)]
    scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tips_shown: Vec<String>,
}

impl FeedbackEvent {
    /// Creates a bare event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(agent_id: AgentId, recommended_action: Action, outcome: FeedbackOutcome) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp_utc: Utc::now(),
            agent_id,
            subject_id: None,
            recommended_action,
            outcome,
            notes: None,
            confidence: None,
            scores: BTreeMap::new(),
            tips_shown: Vec::new(),
        }
    }

    /// Creates an event answering `record`, copying its action, confidence,
    /// and score values.
    #[must_use]
    pub fn for_decision(record: &DecisionRecord, outcome: FeedbackOutcome) -> Self {
        let scores = record
            .scores()
            .iter()
            .map(|(name, score)| (name.clone(), score.value()))
            .collect();
        Self {
            confidence: Some(record.confidence()),
            scores,
            ..Self::new(record.agent_id().clone(), record.chosen_action(), outcome)
        }
    }

    /// Attaches the customer, call, or rep identifier the decision was about.
    #[must_use]
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    /// Attaches free-form notes from the reviewer. Blank notes are dropped.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = (!notes.trim().is_empty()).then_some(notes);
        self
    }

    /// Records the coaching tips that were displayed alongside the decision.
    #[must_use]
    pub fn with_tips(mut self, tips: impl IntoIterator<Item = String>) -> Self {
        self.tips_shown = tips.into_iter().collect();
        self
    }

    /// Unique event identifier.
    #[must_use]
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Time the feedback was captured.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    /// Agent whose recommendation was reviewed.
    #[must_use]
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Subject of the decision, if known.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    /// Action that was recommended.
    #[must_use]
    pub fn recommended_action(&self) -> Action {
        self.recommended_action
    }

    /// What the human did.
    #[must_use]
    pub fn outcome(&self) -> FeedbackOutcome {
        self.outcome
    }

    /// Reviewer notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Confidence of the reviewed decision.
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Score values of the reviewed decision.
    #[must_use]
    pub fn scores(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    /// Tips shown with the decision.
    #[must_use]
    pub fn tips_shown(&self) -> &[String] {
        &self.tips_shown
    }
}

/// Counts of outcomes over a slice of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackTally {
    /// Accepted recommendations.
    pub accepted: usize,
    /// Ignored recommendations.
    pub ignored: usize,
    /// Edited recommendations.
    pub edited: usize,
}

impl FeedbackTally {
    /// Tallies the outcomes of `events`.
    #[must_use]
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a FeedbackEvent>) -> Self {
        events.into_iter().fold(Self::default(), |mut tally, event| {
            match event.outcome() {
                FeedbackOutcome::Accepted => tally.accepted += 1,
                FeedbackOutcome::Ignored => tally.ignored += 1,
                FeedbackOutcome::Edited => tally.edited += 1,
            }
            tally
        })
    }

    /// Total number of events.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.accepted + self.ignored + self.edited
    }

    /// Share of events acted on, counting edits. `None` for an empty tally.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn acted_on_ratio(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| (self.accepted + self.edited) as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitl_policy::{Score, ScoreRange};

    fn record() -> DecisionRecord {
        let (score, _) = Score::clamped(ScoreRange::Unit, 0.82);
        DecisionRecord::builder(AgentId::retention())
            .scores(BTreeMap::from([("churn_risk".to_owned(), score)]))
            .confidence(0.71)
            .action(Action::Draft, Some("high-risk".into()))
            .build()
    }

    #[test]
    fn for_decision_copies_action_and_scores() {
        let event = FeedbackEvent::for_decision(&record(), FeedbackOutcome::Edited)
            .with_subject("cust-42")
            .with_notes("softened the tone");

        assert_eq!(event.agent_id(), &AgentId::retention());
        assert_eq!(event.recommended_action(), Action::Draft);
        assert_eq!(event.outcome(), FeedbackOutcome::Edited);
        assert_eq!(event.subject_id(), Some("cust-42"));
        assert_eq!(event.notes(), Some("softened the tone"));
        assert_eq!(event.confidence(), Some(0.71));
        assert_eq!(event.scores().get("churn_risk"), Some(&0.82));
    }

    #[test]
    fn blank_notes_are_dropped() {
        let event = FeedbackEvent::new(AgentId::negotiator(), Action::Suggest, FeedbackOutcome::Ignored)
            .with_notes("   ");
        assert_eq!(event.notes(), None);
    }

    #[test]
    fn outcome_parses_case_insensitively() {
        assert_eq!("Accepted".parse::<FeedbackOutcome>().unwrap(), FeedbackOutcome::Accepted);
        assert_eq!(" edited ".parse::<FeedbackOutcome>().unwrap(), FeedbackOutcome::Edited);
        assert!(matches!(
            "maybe".parse::<FeedbackOutcome>(),
            Err(JournalError::UnknownOutcome(label)) if label == "maybe"
        ));
    }

    #[test]
    fn serialized_event_uses_snake_case_labels() {
        let event = FeedbackEvent::new(AgentId::sales_coach(), Action::ScoreAndTips, FeedbackOutcome::Accepted)
            .with_tips(["Ask one clarifying question.".to_owned()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["recommended_action"], "score_and_tips");
        assert_eq!(json["outcome"], "accepted");
        assert_eq!(json["agent_id"], "sales-coach");
        assert!(json.get("notes").is_none());
        assert_eq!(json["tips_shown"][0], "Ask one clarifying question.");
    }

    #[test]
    fn tally_counts_outcomes() {
        let events = [
            FeedbackOutcome::Accepted,
            FeedbackOutcome::Edited,
            FeedbackOutcome::Ignored,
            FeedbackOutcome::Accepted,
        ]
        .map(|outcome| FeedbackEvent::new(AgentId::retention(), Action::Alert, outcome));

        let tally = FeedbackTally::from_events(&events);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.accepted, 2);
        assert_eq!(tally.acted_on_ratio(), Some(0.75));
        assert_eq!(FeedbackTally::default().acted_on_ratio(), None);
    }
}

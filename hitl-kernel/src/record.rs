//! Immutable output of a decision cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hitl_policy::{Action, Score};
use hitl_primitives::AgentId;
use hitl_telemetry::Diagnostic;
use serde::{Deserialize, Serialize};

use crate::cycle::CycleState;

/// Result of one decision cycle. Read by renderers, feedback logging, and
/// the audit journal; never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    agent_id: AgentId,
    timestamp: DateTime<Utc>,
    scores: BTreeMap<String, Score>,
    confidence: f64,
    chosen_action: Action,
    reasons: Vec<String>,
    kill_switch_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matched_rule: Option<String>,
    policy_version: u64,
    kill_switch_version: u64,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    cycle_trace: Vec<CycleState>,
}

impl DecisionRecord {
    /// Starts building a record for `agent_id`, stamped with the current time.
    #[must_use]
    pub fn builder(agent_id: AgentId) -> DecisionRecordBuilder {
        DecisionRecordBuilder::new(agent_id)
    }

    /// Returns the agent the decision was made for.
    #[must_use]
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Returns when the record was created.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the computed scores, empty when the gate blocked the cycle.
    #[must_use]
    pub fn scores(&self) -> &BTreeMap<String, Score> {
        &self.scores
    }

    /// Returns one score by name.
    #[must_use]
    pub fn score(&self, name: &str) -> Option<Score> {
        self.scores.get(name).copied()
    }

    /// Returns the confidence in `[0, 1]`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the chosen action.
    #[must_use]
    pub fn chosen_action(&self) -> Action {
        self.chosen_action
    }

    /// Returns the ordered explanations.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Returns `true` when the kill switch short-circuited the cycle.
    #[must_use]
    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch_active
    }

    /// Returns the name of the rule that selected the action.
    #[must_use]
    pub fn matched_rule(&self) -> Option<&str> {
        self.matched_rule.as_deref()
    }

    /// Returns the version of the policy book used.
    #[must_use]
    pub fn policy_version(&self) -> u64 {
        self.policy_version
    }

    /// Returns the version of the kill switch snapshot used.
    #[must_use]
    pub fn kill_switch_version(&self) -> u64 {
        self.kill_switch_version
    }

    /// Returns anomalies absorbed during the cycle.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the cycle states visited.
    #[must_use]
    pub fn cycle_trace(&self) -> &[CycleState] {
        &self.cycle_trace
    }

    /// Compares two records ignoring their timestamps.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.agent_id == other.agent_id
            && self.scores == other.scores
            && self.confidence.to_bits() == other.confidence.to_bits()
            && self.chosen_action == other.chosen_action
            && self.reasons == other.reasons
            && self.kill_switch_active == other.kill_switch_active
            && self.matched_rule == other.matched_rule
            && self.policy_version == other.policy_version
            && self.kill_switch_version == other.kill_switch_version
            && self.diagnostics == other.diagnostics
            && self.cycle_trace == other.cycle_trace
    }
}

/// Builder for [`DecisionRecord`]. Confidence is clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct DecisionRecordBuilder {
    record: DecisionRecord,
}

impl DecisionRecordBuilder {
    fn new(agent_id: AgentId) -> Self {
        Self {
            record: DecisionRecord {
                agent_id,
                timestamp: Utc::now(),
                scores: BTreeMap::new(),
                confidence: 0.0,
                chosen_action: Action::None,
                reasons: Vec::new(),
                kill_switch_active: false,
                matched_rule: None,
                policy_version: 0,
                kill_switch_version: 0,
                diagnostics: Vec::new(),
                cycle_trace: Vec::new(),
            },
        }
    }

    /// Overrides the creation time.
    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    /// Sets the scores.
    #[must_use]
    pub fn scores(mut self, scores: BTreeMap<String, Score>) -> Self {
        self.record.scores = scores;
        self
    }

    /// Sets the confidence.
    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.record.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Sets the chosen action and the rule that selected it.
    #[must_use]
    pub fn action(mut self, action: Action, matched_rule: Option<String>) -> Self {
        self.record.chosen_action = action;
        self.record.matched_rule = matched_rule;
        self
    }

    /// Sets the ordered reasons.
    #[must_use]
    pub fn reasons(mut self, reasons: Vec<String>) -> Self {
        self.record.reasons = reasons;
        self
    }

    /// Marks the record as produced by a blocked gate.
    #[must_use]
    pub fn kill_switch_active(mut self, active: bool) -> Self {
        self.record.kill_switch_active = active;
        self
    }

    /// Sets the snapshot versions the cycle read.
    #[must_use]
    pub fn versions(mut self, policy_version: u64, kill_switch_version: u64) -> Self {
        self.record.policy_version = policy_version;
        self.record.kill_switch_version = kill_switch_version;
        self
    }

    /// Sets the absorbed diagnostics.
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.record.diagnostics = diagnostics;
        self
    }

    /// Sets the cycle trace.
    #[must_use]
    pub fn cycle_trace(mut self, trace: Vec<CycleState>) -> Self {
        self.record.cycle_trace = trace;
        self
    }

    /// Finalises the record.
    #[must_use]
    pub fn build(self) -> DecisionRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hitl_policy::ScoreRange;

    fn sample() -> DecisionRecordBuilder {
        let (risk, _) = Score::clamped(ScoreRange::Unit, 0.82);
        DecisionRecord::builder(AgentId::retention())
            .scores(BTreeMap::from([("churn_risk".to_owned(), risk)]))
            .confidence(0.74)
            .action(Action::Draft, Some("high-risk".into()))
            .reasons(vec!["churn_risk 0.82 driven by login_drop_pct".into()])
            .versions(3, 1)
    }

    #[test]
    fn equivalence_ignores_timestamp_only() {
        let first = sample().build();
        let later = sample()
            .timestamp(first.timestamp() + Duration::seconds(5))
            .build();
        assert!(first.is_equivalent(&later));
        assert_ne!(first, later);

        let other = sample().confidence(0.5).build();
        assert!(!first.is_equivalent(&other));
    }

    #[test]
    fn confidence_is_clamped() {
        assert!((sample().confidence(1.7).build().confidence() - 1.0).abs() < f64::EPSILON);
        assert!(sample().confidence(f64::NAN).build().confidence().abs() < f64::EPSILON);
    }

    #[test]
    fn serde_keeps_record_intact() {
        let record = sample().cycle_trace(vec![CycleState::Idle, CycleState::Recorded]).build();
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"chosen_action\":\"draft\""));
        let back: DecisionRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.timestamp(), record.timestamp());
        assert_eq!(back.chosen_action(), Action::Draft);
        assert_eq!(back.reasons(), record.reasons());
        assert_eq!(back.matched_rule(), Some("high-risk"));
        assert_eq!(back.cycle_trace(), record.cycle_trace());
    }
}

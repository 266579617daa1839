//! Threshold routing from scores to a single action.

use std::collections::BTreeMap;

use hitl_telemetry::DiagnosticKind;
use tracing::debug;

use crate::contracts::{ConfidenceGate, PolicyConfig, ThresholdRule};
use crate::decision::{RouteOutcome, Score, ScoreRange};

/// Reason emitted when no rule condition held.
pub const NO_RULE_REASON: &str = "no rule matched";

/// Generic, table-driven router.
///
/// Rules are evaluated in ascending priority. The first priority level with a
/// matching rule decides; its action is offered only when the observed
/// confidence meets the catalog minimum for that action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionRouter;

impl ActionRouter {
    /// Creates a router.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Selects an action for the supplied scores. Never mutates the scores
    /// and never fails; misconfigurations surface as diagnostics.
    #[must_use]
    pub fn route(
        &self,
        scores: &BTreeMap<String, Score>,
        confidence: f64,
        policy: &PolicyConfig,
    ) -> RouteOutcome {
        let confidence = ScoreRange::Unit.clamp(confidence);
        let ordered = policy.rules_in_order();
        let mut outcome = RouteOutcome::default();

        for level in ordered.chunk_by(|a, b| a.priority == b.priority) {
            let matches: Vec<(&ThresholdRule, f64)> = level
                .iter()
                .filter_map(|rule| {
                    let value = scores.get(&rule.score)?.value();
                    rule.condition.holds(value).then_some((*rule, value))
                })
                .collect();

            let Some((rule, value)) = select(&matches, &mut outcome) else {
                continue;
            };

            debug!(
                agent = %policy.agent,
                rule = %rule.name,
                score = %rule.score,
                value,
                action = %rule.action,
                "threshold rule matched"
            );

            let required = policy.min_confidence_for(rule.action);
            if confidence >= required {
                outcome.action = rule.action;
                outcome.rule = Some(rule.name.clone());
                outcome.reasons.push(format!(
                    "rule `{}` matched: {} {value:.2} {}",
                    rule.name, rule.score, rule.condition
                ));
                return outcome;
            }

            let label = policy
                .action_spec(rule.action)
                .map_or_else(|| rule.action.to_string(), |spec| spec.label.clone());
            outcome.reasons.push(format!(
                "confidence {confidence:.2} below {required:.2} required for {label}"
            ));
            outcome.diagnostics.push(
                DiagnosticKind::ConfidenceGate,
                &rule.name,
                format!("confidence {confidence:.2} below {required:.2}; rule suppressed"),
            );

            if policy.confidence_gate == ConfidenceGate::Abstain {
                return outcome;
            }
        }

        if outcome.reasons.is_empty() {
            outcome.reasons.push(NO_RULE_REASON.to_owned());
        }
        outcome
    }
}

/// Picks one rule among the matches of a priority level. Several matches
/// mean the table is ambiguous; the rule whose cutoff sits closest to the
/// observed score wins and the conflict is recorded.
fn select<'r>(
    matches: &[(&'r ThresholdRule, f64)],
    outcome: &mut RouteOutcome,
) -> Option<(&'r ThresholdRule, f64)> {
    match matches {
        [] => None,
        [single] => Some(*single),
        [first, ..] => {
            let chosen = matches
                .iter()
                .copied()
                .min_by(|(a, va), (b, vb)| {
                    a.condition
                        .distance(*va)
                        .total_cmp(&b.condition.distance(*vb))
                })
                .unwrap_or(*first);
            let names: Vec<&str> = matches.iter().map(|(rule, _)| rule.name.as_str()).collect();
            outcome.diagnostics.push(
                DiagnosticKind::ConfigurationConflict,
                format!("priority {}", chosen.0.priority),
                format!(
                    "rules {} matched at equal priority; selected `{}` (tightest cutoff)",
                    names.join(", "),
                    chosen.0.name
                ),
            );
            Some(chosen)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ActionSpec, Contribution, RuleCondition, ScoreInput, ScoreSpec};
    use crate::decision::Action;
    use hitl_primitives::AgentId;

    fn three_tier(min_confidence_for_draft: f64) -> PolicyConfig {
        PolicyConfig::new(AgentId::retention())
            .with_score(ScoreSpec::unit(
                "churn_risk",
                vec![ScoreInput::new("login_drop_pct", 1.0, Contribution::linear(0.0, 1.0))],
            ))
            .with_action(ActionSpec::new(Action::Alert, "Alert CSM", 0.0))
            .with_action(ActionSpec::new(
                Action::Draft,
                "Prepare re-engagement",
                min_confidence_for_draft,
            ))
            .with_rule(ThresholdRule::new("low", "churn_risk", RuleCondition::below(0.5), Action::None, 30))
            .with_rule(ThresholdRule::new(
                "medium",
                "churn_risk",
                RuleCondition::range(0.5, 0.8),
                Action::Alert,
                20,
            ))
            .with_rule(ThresholdRule::new(
                "high",
                "churn_risk",
                RuleCondition::at_least(0.8),
                Action::Draft,
                10,
            ))
    }

    fn risk(value: f64) -> BTreeMap<String, Score> {
        let (score, _) = Score::clamped(ScoreRange::Unit, value);
        BTreeMap::from([("churn_risk".to_owned(), score)])
    }

    #[test]
    fn high_risk_with_confidence_prepares_draft() {
        let outcome = ActionRouter::new().route(&risk(0.85), 0.9, &three_tier(0.5));
        assert_eq!(outcome.action, Action::Draft);
        assert_eq!(outcome.rule.as_deref(), Some("high"));
    }

    #[test]
    fn medium_risk_alerts() {
        let outcome = ActionRouter::new().route(&risk(0.65), 0.9, &three_tier(0.5));
        assert_eq!(outcome.action, Action::Alert);
    }

    #[test]
    fn low_confidence_overrides_score_match() {
        let outcome = ActionRouter::new().route(&risk(0.85), 0.2, &three_tier(0.5));
        assert_eq!(outcome.action, Action::None);
        assert!(outcome.rule.is_none());
        assert!(outcome.diagnostics.contains(DiagnosticKind::ConfidenceGate));
        assert!(outcome.reasons[0].contains("below 0.50"));
    }

    #[test]
    fn fall_through_escalates_to_next_priority() {
        let policy = three_tier(0.6)
            .with_confidence_gate(ConfidenceGate::FallThrough)
            .with_rule(ThresholdRule::new(
                "medium-or-worse",
                "churn_risk",
                RuleCondition::at_least(0.5),
                Action::Alert,
                15,
            ));
        let outcome = ActionRouter::new().route(&risk(0.9), 0.2, &policy);
        assert_eq!(outcome.action, Action::Alert);
        assert_eq!(outcome.rule.as_deref(), Some("medium-or-worse"));
    }

    #[test]
    fn equal_priority_conflict_prefers_tightest_cutoff() {
        let policy = three_tier(0.0).with_rule(ThresholdRule::new(
            "very-high",
            "churn_risk",
            RuleCondition::at_least(0.9),
            Action::Alert,
            10,
        ));
        let outcome = ActionRouter::new().route(&risk(0.92), 1.0, &policy);
        assert_eq!(outcome.rule.as_deref(), Some("very-high"));
        assert!(outcome.diagnostics.contains(DiagnosticKind::ConfigurationConflict));

        // Below 0.9 only one rule of the level matches; no conflict.
        let outcome = ActionRouter::new().route(&risk(0.85), 1.0, &policy);
        assert_eq!(outcome.rule.as_deref(), Some("high"));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn routing_is_monotonic_in_risk() {
        let policy = three_tier(0.5);
        let router = ActionRouter::new();
        let mut previous = 0;
        for step in 0..=100 {
            let value = f64::from(step) / 100.0;
            let urgency = router.route(&risk(value), 0.9, &policy).action.urgency();
            assert!(urgency >= previous, "urgency dropped at {value}");
            previous = urgency;
        }
    }

    #[test]
    fn empty_rule_table_routes_to_none() {
        let mut policy = three_tier(0.5);
        policy.rules.clear();
        let outcome = ActionRouter::new().route(&risk(0.99), 1.0, &policy);
        assert_eq!(outcome.action, Action::None);
        assert_eq!(outcome.reasons, [NO_RULE_REASON]);
    }
}

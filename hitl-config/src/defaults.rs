//! Built-in policies for the three shipped agents.
//!
//! The constants express the agents' hand-tuned rules as weighted signals.
//! Where a rule depended on two counters at once the weights are a linear
//! fit, noted on the score. Deployments override them with a policy file.

use hitl_policy::{
    Action, ActionSpec, ConfidenceFormula, ConfidenceGate, Contribution, PolicyBook, PolicyConfig,
    PolicyResult, RuleCondition, ScoreInput, ScoreSpec, ScoreTransform, ThresholdRule,
};
use hitl_primitives::AgentId;

/// Version stamped on records produced with the built-in policies.
pub const BUILTIN_POLICY_VERSION: u64 = 1;

/// Churn risk from account usage trends.
#[must_use]
pub fn retention_policy() -> PolicyConfig {
    let drop = || Contribution::linear(0.0, 1.0);
    PolicyConfig::new(AgentId::retention())
        .with_primary_score("churn_risk")
        .with_score(
            ScoreSpec::unit(
                "churn_risk",
                vec![
                    ScoreInput::new("login_drop_pct", 0.35, drop()).in_group("usage"),
                    ScoreInput::new("active_minutes_drop_pct", 0.20, drop()).in_group("usage"),
                    ScoreInput::new("feature_usage_drop_pct", 0.15, drop()).in_group("usage"),
                    ScoreInput::new("inactive_streak_days", 0.20, Contribution::linear(0.0, 7.0)),
                    ScoreInput::new("low_usage_ratio", 0.10, drop()),
                ],
            )
            .with_transform(ScoreTransform::Sigmoid {
                center: 0.28,
                scale: 0.10,
            }),
        )
        .with_confidence(ConfidenceFormula::Weighted {
            floor: 0.20,
            coverage_weight: 0.55,
            agreement_weight: 0.25,
        })
        .with_confidence_gate(ConfidenceGate::FallThrough)
        .with_action(ActionSpec::new(Action::Alert, "Alert CSM", 0.0))
        .with_action(ActionSpec::new(Action::Draft, "Prepare re-engagement draft", 0.60))
        .with_rule(ThresholdRule::new(
            "high-risk",
            "churn_risk",
            RuleCondition::at_least(0.80),
            Action::Draft,
            10,
        ))
        .with_rule(ThresholdRule::new(
            "medium-risk",
            "churn_risk",
            RuleCondition::at_least(0.50),
            Action::Alert,
            20,
        ))
        .with_rule(ThresholdRule::new(
            "low-risk",
            "churn_risk",
            RuleCondition::below(0.50),
            Action::None,
            30,
        ))
}

/// Live-call objection pressure from detectors and sentiment.
#[must_use]
pub fn negotiator_policy() -> PolicyConfig {
    PolicyConfig::new(AgentId::negotiator())
        .with_score(ScoreSpec::unit(
            "objection_pressure",
            vec![
                ScoreInput::new("objection_detected", 0.30, Contribution::flag()).in_group("objection"),
                ScoreInput::new("objection_keyword_hit", 0.30, Contribution::flag())
                    .in_group("objection"),
                ScoreInput::new(
                    "sentiment",
                    0.40,
                    Contribution::categorical([("negative", 1.0), ("neutral", 0.5), ("positive", 0.0)]),
                ),
            ],
        ))
        .with_confidence(ConfidenceFormula::Weighted {
            floor: 0.50,
            coverage_weight: 0.6,
            agreement_weight: 0.4,
        })
        .with_action(ActionSpec::new(Action::Suggest, "Whisper suggested reply", 0.45))
        // One objection detector or negative sentiment alone is enough to whisper.
        .with_rule(ThresholdRule::new(
            "objection-raised",
            "objection_pressure",
            RuleCondition::at_least(0.30),
            Action::Suggest,
            10,
        ))
        .with_rule(ThresholdRule::new(
            "calm",
            "objection_pressure",
            RuleCondition::below(0.30),
            Action::None,
            20,
        ))
}

/// Post-call rubric computed from transcript counters.
#[must_use]
pub fn sales_coach_policy() -> PolicyConfig {
    PolicyConfig::new(AgentId::sales_coach())
        .with_score(ScoreSpec::percent(
            "empathy",
            vec![ScoreInput::new("empathy_hits", 1.0, Contribution::linear(0.0, 10.0 / 3.0))],
        ))
        .with_score(ScoreSpec::percent(
            "pacing",
            vec![ScoreInput::new(
                "long_monologue_lines",
                1.0,
                Contribution::inverted(-0.5, 4.5),
            )],
        ))
        // Exact once objections are raised: 80 or 55 for the first, minus 5 per
        // extra one. With no objections it reads 60 to 85 instead of a flat 75.
        .with_score(
            ScoreSpec::percent(
                "objection_handling",
                vec![
                    ScoreInput::new("empathy_hits", 0.25, Contribution::linear(0.0, 2.0)),
                    ScoreInput::new("objection_count", 0.75, Contribution::inverted(-3.0, 12.0)),
                ],
            )
            .with_default(75.0),
        )
        .with_score(ScoreSpec::percent(
            "closing",
            vec![ScoreInput::new(
                "closing_attempted",
                1.0,
                Contribution::Flag {
                    when_true: 0.85,
                    when_false: 0.45,
                },
            )],
        ))
        .with_confidence(ConfidenceFormula::Weighted {
            floor: 0.30,
            coverage_weight: 0.7,
            agreement_weight: 0.3,
        })
        .with_action(ActionSpec::new(Action::ScoreAndTips, "Show scores and coaching tips", 0.30))
        .with_rule(ThresholdRule::new(
            "rubric",
            "closing",
            RuleCondition::at_least(0.0),
            Action::ScoreAndTips,
            10,
        ))
}

/// The three built-in policies.
#[must_use]
pub fn builtin_policies() -> Vec<PolicyConfig> {
    vec![negotiator_policy(), retention_policy(), sales_coach_policy()]
}

/// Validated book of the built-in policies.
///
/// # Errors
///
/// Returns a [`PolicyError`](hitl_policy::PolicyError) if a built-in policy
/// fails validation.
pub fn builtin_policy_book() -> PolicyResult<PolicyBook> {
    PolicyBook::from_policies(BUILTIN_POLICY_VERSION, builtin_policies())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hitl_kernel::{DecisionKernel, KillSwitchGate, KillSwitchHandle, KillSwitchSource, PolicyStore};
    use hitl_primitives::SignalSet;
    use hitl_telemetry::DiagnosticKind;

    fn kernel() -> DecisionKernel {
        DecisionKernel::new(
            KillSwitchGate::new(Arc::new(KillSwitchHandle::default()) as Arc<dyn KillSwitchSource>),
            Arc::new(PolicyStore::new(builtin_policy_book().expect("built-ins validate"))),
        )
    }

    fn signals(entries: &[(&str, hitl_primitives::SignalValue)]) -> SignalSet {
        let mut set = SignalSet::new();
        for (name, value) in entries {
            set.insert(*name, value.clone()).unwrap();
        }
        set
    }

    #[test]
    fn builtin_policies_validate_without_findings() {
        for policy in builtin_policies() {
            let findings = policy.validate().expect("valid");
            assert!(findings.is_empty(), "{}: {findings:?}", policy.agent);
        }
    }

    #[test]
    fn retention_drafts_for_broad_usage_decline() {
        let record = kernel()
            .decide(
                &AgentId::retention(),
                &signals(&[
                    ("login_drop_pct", 0.9.into()),
                    ("active_minutes_drop_pct", 0.8.into()),
                    ("feature_usage_drop_pct", 0.7.into()),
                    ("inactive_streak_days", 5.0.into()),
                    ("low_usage_ratio", 0.8.into()),
                ]),
            )
            .unwrap();
        assert_eq!(record.chosen_action(), Action::Draft);
        assert!(record.score("churn_risk").unwrap().value() > 0.99);
        assert!(record.confidence() > 0.9);
    }

    #[test]
    fn retention_alerts_when_high_risk_lacks_confidence() {
        // Contradicting usage drops lower agreement below the draft gate.
        let record = kernel()
            .decide(
                &AgentId::retention(),
                &signals(&[
                    ("login_drop_pct", 1.0.into()),
                    ("active_minutes_drop_pct", 0.0.into()),
                    ("feature_usage_drop_pct", 1.0.into()),
                ]),
            )
            .unwrap();
        assert!(record.score("churn_risk").unwrap().value() >= 0.8);
        assert!(record.confidence() < 0.6);
        assert_eq!(record.chosen_action(), Action::Alert);
        assert_eq!(record.matched_rule(), Some("medium-risk"));
        assert!(
            record
                .diagnostics()
                .iter()
                .any(|diagnostic| diagnostic.kind() == DiagnosticKind::ConfidenceGate)
        );
    }

    #[test]
    fn retention_stays_quiet_for_healthy_accounts() {
        let record = kernel()
            .decide(
                &AgentId::retention(),
                &signals(&[
                    ("login_drop_pct", 0.1.into()),
                    ("active_minutes_drop_pct", 0.1.into()),
                    ("feature_usage_drop_pct", 0.0.into()),
                    ("inactive_streak_days", 0.0.into()),
                    ("low_usage_ratio", 0.2.into()),
                ]),
            )
            .unwrap();
        assert_eq!(record.chosen_action(), Action::None);
    }

    #[test]
    fn negotiator_whispers_on_agreeing_objection_detectors() {
        let record = kernel()
            .decide(
                &AgentId::negotiator(),
                &signals(&[
                    ("objection_detected", true.into()),
                    ("objection_keyword_hit", true.into()),
                    ("sentiment", "negative".into()),
                ]),
            )
            .unwrap();
        assert_eq!(record.chosen_action(), Action::Suggest);
        assert!((record.confidence() - 1.0).abs() < 1e-9);

        let calm = kernel()
            .decide(
                &AgentId::negotiator(),
                &signals(&[
                    ("objection_detected", false.into()),
                    ("objection_keyword_hit", false.into()),
                    ("sentiment", "positive".into()),
                ]),
            )
            .unwrap();
        assert_eq!(calm.chosen_action(), Action::None);
    }

    #[test]
    fn sales_coach_scores_rubric_in_percent() {
        let record = kernel()
            .decide(
                &AgentId::sales_coach(),
                &signals(&[
                    ("empathy_hits", 2.0.into()),
                    ("long_monologue_lines", 1.0.into()),
                    ("objection_count", 1.0.into()),
                    ("closing_attempted", false.into()),
                ]),
            )
            .unwrap();
        assert_eq!(record.chosen_action(), Action::ScoreAndTips);
        let value = |name: &str| record.score(name).unwrap().value();
        assert!((value("empathy") - 60.0).abs() < 1e-9);
        assert!((value("pacing") - 70.0).abs() < 1e-9);
        assert!((value("closing") - 45.0).abs() < 1e-9);
        assert!((value("objection_handling") - 80.0).abs() < 1e-9);
    }

    #[test]
    fn objection_handling_tracks_objections_and_empathy() {
        let handling = |empathy: f64, objections: f64| {
            kernel()
                .decide(
                    &AgentId::sales_coach(),
                    &signals(&[
                        ("empathy_hits", empathy.into()),
                        ("objection_count", objections.into()),
                    ]),
                )
                .unwrap()
                .score("objection_handling")
                .unwrap()
                .value()
        };

        assert!((handling(0.0, 1.0) - 55.0).abs() < 1e-9);
        assert!((handling(3.0, 2.0) - 75.0).abs() < 1e-9);
        assert!((handling(0.0, 3.0) - 45.0).abs() < 1e-9);
        assert!((handling(1.0, 0.0) - 72.5).abs() < 1e-9);
    }

    #[test]
    fn sales_coach_reasons_cite_signals_when_counters_are_partial() {
        let record = kernel()
            .decide(
                &AgentId::sales_coach(),
                &signals(&[
                    ("closing_attempted", false.into()),
                    ("long_monologue_lines", 3.0.into()),
                ]),
            )
            .unwrap();
        assert_eq!(record.chosen_action(), Action::ScoreAndTips);
        assert!((record.score("objection_handling").unwrap().value() - 75.0).abs() < 1e-9);
        assert!(
            record.reasons()[0].starts_with("closing 45 driven by closing_attempted"),
            "{:?}",
            record.reasons()
        );
        assert!(!record.reasons().iter().any(|reason| reason.contains("degraded default")));
    }

    #[test]
    fn negotiator_whispers_on_a_single_trigger() {
        let decide = |entries: &[(&str, hitl_primitives::SignalValue)]| {
            kernel().decide(&AgentId::negotiator(), &signals(entries)).unwrap()
        };

        let objection_only = decide(&[
            ("objection_detected", true.into()),
            ("objection_keyword_hit", false.into()),
            ("sentiment", "positive".into()),
        ]);
        assert_eq!(objection_only.chosen_action(), Action::Suggest);

        let negative_only = decide(&[
            ("objection_detected", false.into()),
            ("objection_keyword_hit", false.into()),
            ("sentiment", "negative".into()),
        ]);
        assert_eq!(negative_only.chosen_action(), Action::Suggest);

        let neutral = decide(&[
            ("objection_detected", false.into()),
            ("objection_keyword_hit", false.into()),
            ("sentiment", "neutral".into()),
        ]);
        assert_eq!(neutral.chosen_action(), Action::None);
    }
}

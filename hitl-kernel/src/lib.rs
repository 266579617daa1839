//! Decision cycle kernel.
//!
//! [`DecisionKernel::decide`] runs one cycle: kill switch gate, scoring,
//! routing, and record creation. Kill switch state and policies are read from
//! versioned snapshots taken at the start of the cycle, so concurrent
//! administrative changes affect only cycles that start afterwards.

#![warn(missing_docs, clippy::pedantic)]

pub mod batch;
pub mod cycle;
pub mod gate;
pub mod record;
pub mod snapshot;
pub mod store;

use std::sync::Arc;

use hitl_policy::{ActionRouter, ScoringEngine};
use hitl_primitives::{AgentId, SignalSet};
use thiserror::Error;
use tracing::{debug, info};

pub use batch::{BatchConfig, BatchError, BatchResult, BatchRunner, DecisionRequest};
pub use cycle::{Cycle, CycleError, CycleEvent, CycleResult, CycleState};
pub use gate::{
    BlockReason, GateCheck, GateVerdict, KillSwitchGate, KillSwitchHandle, KillSwitchSource,
    KillSwitchState,
};
pub use record::{DecisionRecord, DecisionRecordBuilder};
pub use snapshot::{SnapshotCell, Versioned};
pub use store::PolicyStore;

/// Errors surfaced to callers of [`DecisionKernel::decide`].
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The agent passed the gate but has no policy to route with.
    #[error("no policy configured for agent {0}")]
    MissingPolicy(AgentId),
    /// Internal stage ordering violation.
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Result alias for decision cycles.
pub type DecisionResult<T> = Result<T, DecisionError>;

/// Entry point of the engine. Stateless between cycles; safe to share
/// across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DecisionKernel {
    gate: KillSwitchGate,
    policies: Arc<PolicyStore>,
    scoring: ScoringEngine,
    router: ActionRouter,
}

impl DecisionKernel {
    /// Creates a kernel reading from the supplied gate and policy store.
    #[must_use]
    pub fn new(gate: KillSwitchGate, policies: Arc<PolicyStore>) -> Self {
        Self {
            gate,
            policies,
            scoring: ScoringEngine::new(),
            router: ActionRouter::new(),
        }
    }

    /// Returns the kill switch gate.
    #[must_use]
    pub fn gate(&self) -> &KillSwitchGate {
        &self.gate
    }

    /// Returns the policy store.
    #[must_use]
    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    /// Runs one decision cycle.
    ///
    /// A blocked gate yields a record with [`Action::None`](hitl_policy::Action::None),
    /// no scores, and `kill_switch_active` set; scoring is not attempted.
    /// Missing or malformed signals never fail the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::MissingPolicy`] when the agent is allowed by
    /// the gate but the current policy book has no entry for it.
    pub fn decide(&self, agent_id: &AgentId, signals: &SignalSet) -> DecisionResult<DecisionRecord> {
        let mut cycle = Cycle::new(agent_id.clone());

        let check = self.gate.inspect(agent_id);
        cycle.transition(CycleEvent::CheckGate)?;
        let book = self.policies.snapshot();
        let versions = (book.value().version(), check.version());

        if let GateVerdict::Blocked(reason) = check.verdict() {
            cycle.transition(CycleEvent::ShortCircuit)?;
            info!(agent = %agent_id, %reason, "decision cycle short-circuited");
            return Ok(DecisionRecord::builder(agent_id.clone())
                .kill_switch_active(true)
                .reasons(vec![reason.to_string()])
                .versions(versions.0, versions.1)
                .cycle_trace(cycle.into_trace())
                .build());
        }

        let policy = book
            .value()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| DecisionError::MissingPolicy(agent_id.clone()))?;

        let sheet = self.scoring.score(signals, &policy);
        cycle.transition(CycleEvent::Score)?;

        let outcome = self.router.route(&sheet.scores, sheet.confidence, &policy);
        cycle.transition(CycleEvent::Route)?;

        let mut reasons = sheet.reasons;
        reasons.extend(outcome.reasons);
        let mut diagnostics = sheet.diagnostics;
        diagnostics.absorb(outcome.diagnostics);

        cycle.transition(CycleEvent::Record)?;
        debug!(
            agent = %agent_id,
            action = %outcome.action,
            confidence = sheet.confidence,
            rule = outcome.rule.as_deref().unwrap_or("-"),
            "decision recorded"
        );

        Ok(DecisionRecord::builder(agent_id.clone())
            .scores(sheet.scores)
            .confidence(sheet.confidence)
            .action(outcome.action, outcome.rule)
            .reasons(reasons)
            .versions(versions.0, versions.1)
            .diagnostics(diagnostics.into_vec())
            .cycle_trace(cycle.into_trace())
            .build())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use hitl_policy::{
        Action, ActionSpec, ConfidenceFormula, Contribution, PolicyBook, PolicyConfig, RuleCondition,
        ScoreInput, ScoreSpec, ThresholdRule,
    };

    /// Churn policy on two usage signals with a three-tier rule table.
    pub(crate) fn retention_policy() -> PolicyConfig {
        PolicyConfig::new(AgentId::retention())
            .with_score(ScoreSpec::unit(
                "churn_risk",
                vec![
                    ScoreInput::new("login_drop_pct", 0.5, Contribution::linear(0.0, 1.0))
                        .in_group("usage"),
                    ScoreInput::new("active_minutes_drop_pct", 0.5, Contribution::linear(0.0, 1.0))
                        .in_group("usage"),
                ],
            ))
            .with_confidence(ConfidenceFormula::CoverageOnly)
            .with_action(ActionSpec::new(Action::Alert, "Alert CSM", 0.0))
            .with_action(ActionSpec::new(Action::Draft, "Prepare re-engagement", 0.6))
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

    pub(crate) fn usage(login: f64, minutes: f64) -> SignalSet {
        SignalSet::new()
            .with("login_drop_pct", login)
            .and_then(|set| set.with("active_minutes_drop_pct", minutes))
            .expect("valid signal names")
    }

    pub(crate) fn kernel(switch: &Arc<KillSwitchHandle>) -> DecisionKernel {
        let book = PolicyBook::from_policies(7, [retention_policy()]).expect("valid policy");
        DecisionKernel::new(
            KillSwitchGate::new(Arc::clone(switch) as Arc<dyn KillSwitchSource>),
            Arc::new(PolicyStore::new(book)),
        )
    }
}

//! Declarative per-agent policies and the pure scoring/routing stages of a
//! decision cycle.
//!
//! A [`PolicyConfig`](contracts::PolicyConfig) describes which scores an agent
//! computes, how signals contribute to them, and an ordered table of
//! [`ThresholdRule`](contracts::ThresholdRule)s mapping scores to actions.
//! [`ScoringEngine`](scoring::ScoringEngine) and
//! [`ActionRouter`](router::ActionRouter) evaluate a policy against one
//! [`SignalSet`](hitl_primitives::SignalSet) without side effects.

#![warn(missing_docs, clippy::pedantic)]

pub mod contracts;
pub mod decision;
mod error;
pub mod router;
pub mod scoring;

pub use contracts::{
    ActionSpec, ConfidenceFormula, ConfidenceGate, Contribution, MissingSignals, PolicyBook,
    PolicyConfig, RuleCondition, ScoreInput, ScoreSpec, ScoreTransform, ThresholdRule,
};
pub use decision::{Action, RouteOutcome, Score, ScoreRange, ScoreSheet};
pub use error::{PolicyError, PolicyResult};
pub use router::ActionRouter;
pub use scoring::ScoringEngine;

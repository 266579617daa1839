//! State machine of a single decision cycle.

use hitl_primitives::AgentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Stages a cycle passes through. `Recorded` is terminal per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// No cycle in progress.
    Idle,
    /// Kill switch consulted.
    GateChecked,
    /// Scores and confidence computed.
    Scored,
    /// Action selected.
    Routed,
    /// Decision record produced.
    Recorded,
}

impl CycleState {
    /// Returns `true` once the record exists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Events that advance a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    /// Read the kill switch.
    CheckGate,
    /// Run the scoring engine.
    Score,
    /// Run the action router.
    Route,
    /// Emit the record.
    Record,
    /// Skip straight to the record after a blocked gate.
    ShortCircuit,
    /// Return to idle for the next cycle.
    Reset,
}

/// Tracks one cycle and the states it visited.
#[derive(Debug, Clone)]
pub struct Cycle {
    agent_id: AgentId,
    state: CycleState,
    trace: Vec<CycleState>,
}

impl Cycle {
    /// Starts a cycle in [`CycleState::Idle`].
    #[must_use]
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            state: CycleState::Idle,
            trace: vec![CycleState::Idle],
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// Returns every state visited so far, starting with `Idle`.
    #[must_use]
    pub fn trace(&self) -> &[CycleState] {
        &self.trace
    }

    /// Consumes the cycle, yielding its trace.
    #[must_use]
    pub fn into_trace(self) -> Vec<CycleState> {
        self.trace
    }

    /// Applies an event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::InvalidTransition`] when the event is not
    /// allowed from the current state.
    pub fn transition(&mut self, event: CycleEvent) -> CycleResult<CycleState> {
        let next = match (self.state, event) {
            (CycleState::Idle, CycleEvent::CheckGate) => Some(CycleState::GateChecked),
            (CycleState::GateChecked, CycleEvent::Score) => Some(CycleState::Scored),
            (CycleState::Scored, CycleEvent::Route) => Some(CycleState::Routed),
            (CycleState::Routed, CycleEvent::Record)
            | (CycleState::GateChecked, CycleEvent::ShortCircuit) => Some(CycleState::Recorded),
            (CycleState::Recorded | CycleState::Idle, CycleEvent::Reset) => Some(CycleState::Idle),
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(CycleError::InvalidTransition {
                agent_id: self.agent_id.clone(),
                from: self.state,
                event,
            });
        };

        if next_state != self.state {
            debug!(
                agent_id = %self.agent_id,
                ?self.state,
                ?next_state,
                ?event,
                "decision cycle transition"
            );
            self.state = next_state;
            self.trace.push(next_state);
        }

        Ok(self.state)
    }
}

/// Errors emitted by the cycle state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid cycle transition from {from:?} via {event:?} for agent {agent_id}")]
    InvalidTransition {
        /// Agent the cycle runs for.
        agent_id: AgentId,
        /// State prior to the attempted transition.
        from: CycleState,
        /// Event that was rejected.
        event: CycleEvent,
    },
}

/// Result alias used for cycle operations.
pub type CycleResult<T> = Result<T, CycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_records_every_stage() {
        let mut cycle = Cycle::new(AgentId::retention());
        for event in [
            CycleEvent::CheckGate,
            CycleEvent::Score,
            CycleEvent::Route,
            CycleEvent::Record,
        ] {
            cycle.transition(event).unwrap();
        }
        assert!(cycle.state().is_terminal());
        assert_eq!(
            cycle.trace(),
            [
                CycleState::Idle,
                CycleState::GateChecked,
                CycleState::Scored,
                CycleState::Routed,
                CycleState::Recorded
            ]
        );
    }

    #[test]
    fn short_circuit_skips_scoring() {
        let mut cycle = Cycle::new(AgentId::negotiator());
        cycle.transition(CycleEvent::CheckGate).unwrap();
        cycle.transition(CycleEvent::ShortCircuit).unwrap();
        assert_eq!(
            cycle.into_trace(),
            [CycleState::Idle, CycleState::GateChecked, CycleState::Recorded]
        );
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut cycle = Cycle::new(AgentId::negotiator());
        cycle.transition(CycleEvent::CheckGate).unwrap();
        cycle.transition(CycleEvent::ShortCircuit).unwrap();
        assert_eq!(cycle.transition(CycleEvent::Reset).unwrap(), CycleState::Idle);
    }

    #[test]
    fn scoring_before_gate_is_rejected() {
        let mut cycle = Cycle::new(AgentId::sales_coach());
        let err = cycle
            .transition(CycleEvent::Score)
            .expect_err("score should fail from idle");
        assert!(matches!(
            err,
            CycleError::InvalidTransition {
                from: CycleState::Idle,
                event: CycleEvent::Score,
                ..
            }
        ));
        assert_eq!(cycle.trace(), [CycleState::Idle]);
    }
}

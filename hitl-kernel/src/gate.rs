//! Global and per-agent kill switch.
//!
//! The gate runs before any other work in a cycle. A missing per-agent entry
//! means enabled; only an explicit `false` blocks an agent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use hitl_primitives::AgentId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::snapshot::{SnapshotCell, Versioned};

const fn enabled() -> bool {
    true
}

/// Process-wide enable flags.
///
/// Deserializes from `{global_enabled, agents}` where `true` means enabled.
/// The older `{global_disabled, agents}` layout, where `true` means
/// disabled, is accepted and inverted. Any other field is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredState")]
pub struct KillSwitchState {
    global_enabled: bool,
    agents: BTreeMap<AgentId, bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredState {
    Enabled(EnabledFlags),
    Disabled(DisabledFlags),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnabledFlags {
    #[serde(default = "enabled")]
    global_enabled: bool,
    #[serde(default)]
    agents: BTreeMap<AgentId, bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DisabledFlags {
    global_disabled: bool,
    #[serde(default)]
    agents: BTreeMap<AgentId, bool>,
}

impl From<StoredState> for KillSwitchState {
    fn from(stored: StoredState) -> Self {
        match stored {
            StoredState::Enabled(flags) => Self {
                global_enabled: flags.global_enabled,
                agents: flags.agents,
            },
            StoredState::Disabled(flags) => Self {
                global_enabled: !flags.global_disabled,
                agents: flags
                    .agents
                    .into_iter()
                    .map(|(agent, disabled)| (agent, !disabled))
                    .collect(),
            },
        }
    }
}

impl Default for KillSwitchState {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl KillSwitchState {
    /// Everything enabled, no per-agent overrides.
    #[must_use]
    pub const fn all_enabled() -> Self {
        Self {
            global_enabled: true,
            agents: BTreeMap::new(),
        }
    }

    /// Returns a copy with the global flag set.
    #[must_use]
    pub fn with_global_enabled(mut self, enabled: bool) -> Self {
        self.global_enabled = enabled;
        self
    }

    /// Returns a copy with an explicit entry for `agent`.
    #[must_use]
    pub fn with_agent(mut self, agent: AgentId, enabled: bool) -> Self {
        self.agents.insert(agent, enabled);
        self
    }

    /// Sets the global flag in place.
    pub fn set_global_enabled(&mut self, enabled: bool) {
        self.global_enabled = enabled;
    }

    /// Sets an explicit per-agent entry in place.
    pub fn set_agent_enabled(&mut self, agent: AgentId, enabled: bool) {
        self.agents.insert(agent, enabled);
    }

    /// Returns the global flag.
    #[must_use]
    pub const fn global_enabled(&self) -> bool {
        self.global_enabled
    }

    /// Returns the explicit entry for `agent`, if any.
    #[must_use]
    pub fn agent_entry(&self, agent: &AgentId) -> Option<bool> {
        self.agents.get(agent).copied()
    }

    /// Iterates over explicit per-agent entries.
    pub fn agents(&self) -> impl Iterator<Item = (&AgentId, bool)> {
        self.agents.iter().map(|(agent, enabled)| (agent, *enabled))
    }

    /// Evaluates the flags for one agent.
    #[must_use]
    pub fn evaluate(&self, agent: &AgentId) -> GateVerdict {
        if !self.global_enabled {
            return GateVerdict::Blocked(BlockReason::GlobalDisabled);
        }
        match self.agent_entry(agent) {
            Some(false) => GateVerdict::Blocked(BlockReason::AgentDisabled(agent.clone())),
            _ => GateVerdict::Allowed,
        }
    }
}

/// Why the gate refused a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The global switch is off.
    GlobalDisabled,
    /// The agent's own switch is off.
    AgentDisabled(AgentId),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalDisabled => f.write_str("kill switch active: suggestions disabled globally"),
            Self::AgentDisabled(agent) => {
                write!(f, "kill switch active: suggestions disabled for agent {agent}")
            }
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// The cycle may proceed.
    Allowed,
    /// The cycle must short-circuit.
    Blocked(BlockReason),
}

impl GateVerdict {
    /// Returns `true` when the cycle may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Read-only access to the current kill switch snapshot.
pub trait KillSwitchSource: Send + Sync + fmt::Debug {
    /// Returns the snapshot a cycle should use from gate check to record.
    fn snapshot(&self) -> Arc<Versioned<KillSwitchState>>;
}

/// In-memory kill switch, toggled by an administrator.
#[derive(Debug, Default)]
pub struct KillSwitchHandle {
    cell: SnapshotCell<KillSwitchState>,
}

impl KillSwitchHandle {
    /// Creates a handle publishing `state`.
    #[must_use]
    pub fn new(state: KillSwitchState) -> Self {
        Self {
            cell: SnapshotCell::new(state),
        }
    }

    /// Flips the global flag, returning the new snapshot version.
    pub fn set_global_enabled(&self, enabled: bool) -> u64 {
        let version = self
            .cell
            .update(|state| state.clone().with_global_enabled(enabled));
        info!(enabled, version, "global kill switch updated");
        version
    }

    /// Flips one agent's flag, returning the new snapshot version.
    pub fn set_agent_enabled(&self, agent: &AgentId, enabled: bool) -> u64 {
        let version = self
            .cell
            .update(|state| state.clone().with_agent(agent.clone(), enabled));
        info!(agent = %agent, enabled, version, "agent kill switch updated");
        version
    }

    /// Replaces the whole state, e.g. after re-reading persisted flags.
    pub fn replace(&self, state: KillSwitchState) -> u64 {
        self.cell.store(state)
    }
}

impl KillSwitchSource for KillSwitchHandle {
    fn snapshot(&self) -> Arc<Versioned<KillSwitchState>> {
        self.cell.load()
    }
}

/// Gate check together with the snapshot version it was decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateCheck {
    verdict: GateVerdict,
    version: u64,
}

impl GateCheck {
    /// Returns the verdict.
    #[must_use]
    pub const fn verdict(&self) -> &GateVerdict {
        &self.verdict
    }

    /// Returns the kill switch snapshot version that was read.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }
}

/// Pure read of the kill switch for one agent.
#[derive(Debug, Clone)]
pub struct KillSwitchGate {
    source: Arc<dyn KillSwitchSource>,
}

impl KillSwitchGate {
    /// Creates a gate over any kill switch source.
    #[must_use]
    pub fn new(source: Arc<dyn KillSwitchSource>) -> Self {
        Self { source }
    }

    /// Returns `Allowed` or `Blocked(reason)` for `agent`.
    #[must_use]
    pub fn check(&self, agent: &AgentId) -> GateVerdict {
        self.inspect(agent).verdict
    }

    /// Like [`KillSwitchGate::check`] but also reports the snapshot version.
    #[must_use]
    pub fn inspect(&self, agent: &AgentId) -> GateCheck {
        let snapshot = self.source.snapshot();
        GateCheck {
            verdict: snapshot.value().evaluate(agent),
            version: snapshot.version(),
        }
    }
}

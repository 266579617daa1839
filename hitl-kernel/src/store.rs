//! Reloadable policy book.

use std::sync::Arc;

use hitl_policy::{PolicyBook, PolicyConfig};
use hitl_primitives::AgentId;
use tracing::info;

use crate::snapshot::{SnapshotCell, Versioned};

/// Current [`PolicyBook`], swapped whole on reload. Cycles already in flight
/// keep the book they started with.
#[derive(Debug, Default)]
pub struct PolicyStore {
    cell: SnapshotCell<PolicyBook>,
}

impl PolicyStore {
    /// Creates a store publishing `book`.
    #[must_use]
    pub fn new(book: PolicyBook) -> Self {
        Self {
            cell: SnapshotCell::new(book),
        }
    }

    /// Returns the current book.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Versioned<PolicyBook>> {
        self.cell.load()
    }

    /// Returns the current policy for `agent`.
    #[must_use]
    pub fn policy_for(&self, agent: &AgentId) -> Option<Arc<PolicyConfig>> {
        self.snapshot().value().get(agent).cloned()
    }

    /// Publishes a new book; subsequent cycles use it.
    pub fn reload(&self, book: PolicyBook) -> u64 {
        let book_version = book.version();
        let agents = book.len();
        let version = self.cell.store(book);
        info!(book_version, agents, snapshot = version, "policy book reloaded");
        version
    }
}

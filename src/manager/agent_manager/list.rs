//! Registered agent listing

use std::collections::BTreeSet;

use crate::types::identifiers::AgentId;

use super::core::AgentManager;

impl AgentManager {
    /// Registered agents whose worker is running
    ///
    /// An agent whose worker task crashed stays registered, and visible through
    /// `is_alive` and `summaries`, until it is stopped, but is not listed here.
    #[must_use]
    pub fn list(&self) -> BTreeSet<AgentId> {
        self.workers
            .lock()
            .values()
            .filter(|w| w.is_alive())
            .map(|w| w.agent())
            .collect()
    }

    /// Number of running agents
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.lock().values().filter(|w| w.is_alive()).count()
    }

    /// Whether no agent is running
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

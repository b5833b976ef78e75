//! Per-agent queries

use serde::Serialize;

use crate::types::identifiers::{AgentId, ConversationId};

use super::super::worker::WorkerState;
use super::core::AgentManager;

/// Snapshot of one registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    /// Agent identity
    pub id: AgentId,
    /// Agent name
    pub name: String,
    /// Provider name recorded at spawn
    pub provider: String,
    /// Conversation the agent appends to
    pub conversation: ConversationId,
    /// Worker processing state
    pub state: WorkerState,
    /// Whether the worker task is running
    pub alive: bool,
}

impl AgentManager {
    /// Whether the agent's worker task is still running
    ///
    /// `None` if the agent is not registered. A registered agent whose task
    /// ended unexpectedly reports `Some(false)`.
    #[must_use]
    pub fn is_alive(&self, agent: AgentId) -> Option<bool> {
        self.workers.lock().get(&agent).map(|w| w.is_alive())
    }

    /// Conversation of a registered agent
    #[must_use]
    pub fn conversation(&self, agent: AgentId) -> Option<ConversationId> {
        self.workers.lock().get(&agent).map(|w| w.conversation())
    }

    /// Snapshot of all registered agents, ordered by id
    ///
    /// Crashed agents are included with `alive == false`.
    #[must_use]
    pub fn summaries(&self) -> Vec<AgentSummary> {
        let snapshot: Vec<(AgentId, ConversationId, WorkerState, bool)> = self
            .workers
            .lock()
            .values()
            .map(|w| (w.agent(), w.conversation(), w.state(), w.is_alive()))
            .collect();

        let mut summaries: Vec<AgentSummary> = snapshot
            .into_iter()
            .map(|(id, conversation, state, alive)| {
                let (name, provider) = match self.store.agent(id) {
                    Ok(Some(record)) => (record.name, record.provider),
                    Ok(None) => (String::new(), String::new()),
                    Err(e) => {
                        log::warn!("failed to load {id}: {e}");
                        (String::new(), String::new())
                    }
                };
                AgentSummary {
                    id,
                    name,
                    provider,
                    conversation,
                    state,
                    alive,
                }
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }
}

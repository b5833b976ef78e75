//! In-process history store
//!
//! One `parking_lot` mutex guards all tables; every method holds it only for
//! the duration of a map operation.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{OrchestratorError, Result};
use crate::types::identifiers::{AgentId, ConversationId, TurnId};
use crate::types::messages::{Role, Turn};

use super::{AgentRecord, AgentStatus, HistoryStore};

struct Conversation {
    agent: AgentId,
    title: String,
    turns: Vec<Turn>,
}

#[derive(Default)]
struct Tables {
    agents: HashMap<AgentId, AgentRecord>,
    conversations: HashMap<ConversationId, Conversation>,
    next_agent: u64,
    next_conversation: u64,
    next_turn: u64,
}

/// History store kept in memory for the lifetime of the process
#[derive(Default)]
pub struct InMemoryHistory {
    tables: Mutex<Tables>,
}

impl InMemoryHistory {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every agent record, ordered by identity
    #[must_use]
    pub fn agents(&self) -> Vec<AgentRecord> {
        let tables = self.tables.lock();
        let mut agents: Vec<AgentRecord> = tables.agents.values().cloned().collect();
        agents.sort_by_key(|a| a.id);
        agents
    }

    /// Conversations owned by `agent` as `(id, title)` pairs
    #[must_use]
    pub fn conversations_of(&self, agent: AgentId) -> Vec<(ConversationId, String)> {
        let tables = self.tables.lock();
        let mut found: Vec<(ConversationId, String)> = tables
            .conversations
            .iter()
            .filter(|(_, c)| c.agent == agent)
            .map(|(id, c)| (*id, c.title.clone()))
            .collect();
        found.sort_by_key(|(id, _)| *id);
        found
    }
}

impl HistoryStore for InMemoryHistory {
    fn create_agent(&self, name: &str, provider: &str) -> Result<AgentId> {
        let mut tables = self.tables.lock();
        tables.next_agent += 1;
        let id = AgentId::new(tables.next_agent);
        tables.agents.insert(
            id,
            AgentRecord {
                id,
                name: name.to_string(),
                provider: provider.to_string(),
                status: AgentStatus::Running,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn set_agent_status(&self, agent: AgentId, status: AgentStatus) -> Result<()> {
        let mut tables = self.tables.lock();
        let record = tables
            .agents
            .get_mut(&agent)
            .ok_or(OrchestratorError::AgentNotFound(agent))?;
        record.status = status;
        Ok(())
    }

    fn agent(&self, agent: AgentId) -> Result<Option<AgentRecord>> {
        Ok(self.tables.lock().agents.get(&agent).cloned())
    }

    fn create_conversation(&self, agent: AgentId, title: &str) -> Result<ConversationId> {
        let mut tables = self.tables.lock();
        if !tables.agents.contains_key(&agent) {
            return Err(OrchestratorError::AgentNotFound(agent));
        }
        tables.next_conversation += 1;
        let id = ConversationId::new(tables.next_conversation);
        tables.conversations.insert(
            id,
            Conversation {
                agent,
                title: title.to_string(),
                turns: Vec::new(),
            },
        );
        Ok(id)
    }

    fn append(&self, conversation: ConversationId, role: Role, text: &str) -> Result<TurnId> {
        let mut tables = self.tables.lock();
        if !tables.conversations.contains_key(&conversation) {
            return Err(OrchestratorError::storage(format!("unknown {conversation}")));
        }
        tables.next_turn += 1;
        let id = TurnId::new(tables.next_turn);
        let entry = tables
            .conversations
            .get_mut(&conversation)
            .ok_or_else(|| OrchestratorError::storage(format!("unknown {conversation}")))?;
        let position = entry.turns.len() as u64;
        entry.turns.push(Turn {
            id,
            conversation,
            role,
            text: text.to_string(),
            position,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn recent(&self, conversation: ConversationId, limit: usize) -> Result<Vec<Turn>> {
        let tables = self.tables.lock();
        let entry = tables
            .conversations
            .get(&conversation)
            .ok_or_else(|| OrchestratorError::storage(format!("unknown {conversation}")))?;
        let skip = entry.turns.len().saturating_sub(limit);
        Ok(entry.turns[skip..].to_vec())
    }
}

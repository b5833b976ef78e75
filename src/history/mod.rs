//! Conversation history and agent metadata
//!
//! The orchestrator only depends on the [`HistoryStore`] trait. Ordering is the
//! sole consistency guarantee a store must give: turns of one conversation come
//! back in exactly the order they were appended, and are never mutated.
//!
//! Methods are synchronous and are called from worker tasks; a store backed by
//! blocking I/O should hand the work to `tokio::task::block_in_place` or keep
//! its critical sections short.

mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::identifiers::{AgentId, ConversationId, TurnId};
use crate::types::messages::{Role, Turn};

pub use memory::InMemoryHistory;

/// Externally visible lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Worker registered and accepting mail
    Running,
    /// Stopped through the manager
    Stopped,
}

/// Stored agent metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Agent identity
    pub id: AgentId,
    /// Human-readable name; not unique
    pub name: String,
    /// Name of the provider bound at spawn time
    pub provider: String,
    /// Lifecycle state
    pub status: AgentStatus,
    /// Spawn time
    pub created_at: DateTime<Utc>,
}

/// Append-only turn log plus agent registry records
pub trait HistoryStore: Send + Sync {
    /// Allocate a new agent identity; identities are never reused
    ///
    /// # Errors
    /// Returns error if the store cannot persist the record
    fn create_agent(&self, name: &str, provider: &str) -> Result<AgentId>;

    /// Update the stored status of an agent
    ///
    /// # Errors
    /// Returns error if the agent is unknown or the update fails
    fn set_agent_status(&self, agent: AgentId, status: AgentStatus) -> Result<()>;

    /// Look up agent metadata
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn agent(&self, agent: AgentId) -> Result<Option<AgentRecord>>;

    /// Open a new empty conversation owned by `agent`
    ///
    /// # Errors
    /// Returns error if the agent is unknown or the store cannot persist
    fn create_conversation(&self, agent: AgentId, title: &str) -> Result<ConversationId>;

    /// Append one turn at the end of a conversation
    ///
    /// # Errors
    /// Returns error if the conversation is unknown or the store cannot persist
    fn append(&self, conversation: ConversationId, role: Role, text: &str) -> Result<TurnId>;

    /// The last `limit` turns of a conversation, oldest first
    ///
    /// # Errors
    /// Returns error if the conversation is unknown or the store cannot be read
    fn recent(&self, conversation: ConversationId, limit: usize) -> Result<Vec<Turn>>;
}

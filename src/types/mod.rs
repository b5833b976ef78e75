//! Type definitions for the agent orchestrator
//!
//! - [`identifiers`] - Type-safe ID wrappers (`AgentId`, `ConversationId`, `TurnId`, `SessionId`)
//! - [`messages`] - Turns, provider context messages and inbound content shapes
//! - [`options`] - Streaming provider and worker configuration

pub mod identifiers;
pub mod messages;
pub mod options;

// Re-export commonly used types
pub use identifiers::{AgentId, ConversationId, SessionId, TurnId};
pub use messages::{ChatMessage, ContentPart, ContentValue, Role, Turn};
pub use options::{
    ReadinessPolicy, RestartPolicy, StreamProcessConfig, StreamProcessConfigBuilder, WorkerConfig,
};

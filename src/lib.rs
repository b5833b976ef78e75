//! # Agent orchestrator
//!
//! Runs long-lived conversational agents. Each agent owns one worker task
//! with an unbounded FIFO mailbox, a conversation in a [`HistoryStore`], and a
//! [`Provider`] that turns the recent conversation into a reply.
//!
//! The interesting provider is [`StreamProcessProvider`]: it keeps one child
//! process per agent alive, speaks newline-delimited JSON with it, and turns
//! its streamed events back into a single reply per call.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kodegen_agent_orchestrator::{
//!     AgentManager, InMemoryHistory, ProviderBinding, StreamProcessConfig, WorkerConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryHistory::new());
//!     let manager = AgentManager::new(store, WorkerConfig::default())
//!         .with_reply_callback(|agent, reply| println!("{agent}: {reply}"));
//!
//!     let config = StreamProcessConfig::builder("claude")
//!         .instructions("Answer briefly.")
//!         .build();
//!     let agent = manager.spawn("helper", ProviderBinding::stream_process(config))?;
//!
//!     manager.submit(agent, "Hi");
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Configuration problems (missing binary, missing credential) fail when the
//! provider is built, so they surface from [`AgentManager::spawn`]. Everything
//! after that degrades to reply text: the streaming provider answers with
//! [`Sentinel`] texts and a worker stores any provider error as
//! `"[error: <cause>]"`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod message;
pub mod provider;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use config::{ProviderKind, Settings};
pub use error::{OrchestratorError, Result};
pub use history::{AgentRecord, AgentStatus, HistoryStore, InMemoryHistory};
pub use manager::{AgentManager, AgentSummary, ReplyCallback, WorkerHandle, WorkerSpec, WorkerState};
pub use message::{InboundEvent, parse_line};
pub use provider::{
    CommandProvider, Provider, ProviderBinding, Sentinel, StreamProcessProvider, error_reply,
    is_sentinel,
};
#[cfg(feature = "http")]
pub use provider::{AnthropicProvider, OpenAiProvider};
pub use transport::{ProcessSession, ProviderPhase};

pub use types::identifiers::{AgentId, ConversationId, SessionId, TurnId};
pub use types::messages::{ChatMessage, ContentPart, ContentValue, Role, Turn};
pub use types::options::{
    ReadinessPolicy, RestartPolicy, StreamProcessConfig, StreamProcessConfigBuilder, WorkerConfig,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

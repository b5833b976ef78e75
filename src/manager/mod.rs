//! Agent workers and their manager
//!
//! Each agent gets one worker task with an unbounded FIFO mailbox. The
//! `AgentManager` keeps the registry and never touches conversation content.
//!
//! # Module Structure
//!
//! - `agent_manager` - `AgentManager` with its public API
//! - `worker` - `WorkerHandle`, the per-agent mailbox owner
//! - `background` - The worker loop task
//! - `helpers` - Pure helpers for building provider context

mod agent_manager;
mod background;
mod helpers;
mod worker;

pub use agent_manager::{AgentManager, AgentSummary};
pub use worker::{ReplyCallback, WorkerHandle, WorkerSpec, WorkerState};

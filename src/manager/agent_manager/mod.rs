//! Agent manager implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructors, and shutdown
//! - `spawn`: Agent spawning
//! - `interaction`: Submitting mail and stopping agents
//! - `list`: Registered agent listing
//! - `info`: Per-agent queries and summaries

mod core;
mod info;
mod interaction;
mod list;
mod spawn;

pub use core::AgentManager;
pub use info::AgentSummary;

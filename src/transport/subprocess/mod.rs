//! Streaming child process transport
//!
//! Spawns a persistent CLI child speaking newline-delimited JSON, writes user
//! turns to its stdin and turns its stdout into a queue of reply chunks.

mod codec;
mod command;
mod config;
mod lifecycle;
mod phase;
mod reader;
mod session;

pub use codec::JsonLineCodec;
pub use command::CommandBuilder;
pub use config::{ALLOWED_EXTRA_FLAGS, CLOSE_TIMEOUT, DANGEROUS_ENV_VARS, EXIT_GRACE};
pub use phase::{PhaseCell, ProviderPhase};
pub use reader::LastError;
pub use session::{Collected, ProcessSession};

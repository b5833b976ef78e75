//! Error types for the agent orchestrator

use thiserror::Error;

use crate::types::identifiers::AgentId;

/// Main error type for the agent orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Provider executable not found or not installed
    #[error("Provider executable not found: {0}")]
    CliNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A credential required by a provider is missing
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Failed to start or attach to a child process
    #[error("Connection error: {0}")]
    Connection(String),

    /// Process execution error with exit code and stderr
    #[error("Process error (exit code {exit_code}): {message}")]
    Process {
        /// Error message
        message: String,
        /// Process exit code (-1 when terminated by a signal)
        exit_code: i32,
        /// Standard error output
        stderr: Option<String>,
    },

    /// JSON encode/decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Transport layer error (pipe writes, closed stdin)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Upstream provider rejected or failed a request
    #[error("Provider error: {0}")]
    Provider(String),

    /// History store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// No agent registered under this identity
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Agent worker has been stopped and accepts no more mail
    #[error("Agent {0} is stopped")]
    AgentStopped(AgentId),

    /// Agent worker task terminated abnormally
    #[error("Agent worker panicked: {0}")]
    WorkerPanicked(String),

    /// History handed to a provider contains no user turn
    #[error("No user turn in conversation context")]
    EmptyPrompt,
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Create a CLI not found error for the given program
    pub fn cli_not_found(program: impl Into<String>) -> Self {
        Self::CliNotFound(format!(
            "'{}' is not on PATH and is not an existing file.\n\
             Install the CLI or pass an absolute path in the provider configuration",
            program.into()
        ))
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a missing credential error
    pub fn missing_credential(name: impl Into<String>) -> Self {
        Self::MissingCredential(name.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a process error
    pub fn process(msg: impl Into<String>, exit_code: i32, stderr: Option<String>) -> Self {
        Self::Process {
            message: msg.into(),
            exit_code,
            stderr,
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

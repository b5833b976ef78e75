//! Provider and worker configuration
//!
//! [`StreamProcessConfig`] describes how to launch and talk to one persistent
//! line-JSON child process; [`WorkerConfig`] describes how an agent worker
//! builds provider context. Both are passed explicitly into constructors,
//! nothing in here reads the environment.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::identifiers::SessionId;

/// Default overall deadline for one reply
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(120);

/// Default window for coalescing streamed chunks after the first one
pub const DEFAULT_GATHER_WINDOW: Duration = Duration::from_millis(500);

/// Default silence that ends the coalescing window early
pub const DEFAULT_GATHER_IDLE: Duration = Duration::from_millis(100);

/// Default maximum length of one protocol line (1MB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Default number of stored turns handed to a provider
pub const DEFAULT_CONTEXT_WINDOW: usize = 20;

// ============================================================================
// Policies
// ============================================================================

/// Whether a fresh child must announce readiness before the first turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessPolicy {
    /// Write immediately; an init event only updates the reported phase
    #[default]
    Advisory,
    /// Wait up to the given duration for an init event, then write anyway
    Await(Duration),
}

/// What `generate` does when it finds the child process dead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Spawn a replacement child (same session id) on the next call
    #[default]
    OnNextCall,
    /// Keep reporting the exit; the provider instance stays failed
    Never,
}

// ============================================================================
// Stream Process Config
// ============================================================================

/// Launch and protocol options for a persistent line-JSON child process
#[derive(Debug, Clone)]
pub struct StreamProcessConfig {
    /// Executable name (looked up on PATH) or path
    pub program: PathBuf,
    /// Arguments placed before the protocol flags
    pub args: Vec<String>,
    /// Session id; generated when not supplied
    pub session_id: Option<SessionId>,
    /// Tooling (MCP) configuration file passed to the child
    pub mcp_config: Option<PathBuf>,
    /// Working directory of the child
    pub cwd: Option<PathBuf>,
    /// Standing instructions prepended once to the first user turn
    pub instructions: Option<String>,
    /// Model name forwarded to the child
    pub model: Option<String>,
    /// Extra environment variables for the child
    pub env: HashMap<String, String>,
    /// Extra allow-listed CLI flags (`--flag [value]`)
    pub extra_args: Vec<(String, Option<String>)>,
    /// Pass `--dangerously-skip-permissions`
    pub skip_permissions: bool,
    /// Overall deadline for one reply
    pub response_timeout: Duration,
    /// Coalescing window after the first chunk
    pub gather_window: Duration,
    /// Silence that closes the coalescing window early
    pub gather_idle: Duration,
    /// Maximum protocol line length; longer lines are discarded
    pub max_line_length: usize,
    /// Readiness handling for fresh children
    pub readiness: ReadinessPolicy,
    /// Dead-child handling
    pub restart: RestartPolicy,
}

impl StreamProcessConfig {
    /// Create a new builder for the given program
    #[must_use]
    pub fn builder(program: impl Into<PathBuf>) -> StreamProcessConfigBuilder {
        StreamProcessConfigBuilder {
            config: Self {
                program: program.into(),
                args: Vec::new(),
                session_id: None,
                mcp_config: None,
                cwd: None,
                instructions: None,
                model: None,
                env: HashMap::new(),
                extra_args: Vec::new(),
                skip_permissions: false,
                response_timeout: DEFAULT_RESPONSE_TIMEOUT,
                gather_window: DEFAULT_GATHER_WINDOW,
                gather_idle: DEFAULT_GATHER_IDLE,
                max_line_length: DEFAULT_MAX_LINE_LENGTH,
                readiness: ReadinessPolicy::default(),
                restart: RestartPolicy::default(),
            },
        }
    }
}

// ============================================================================
// Builder for StreamProcessConfig
// ============================================================================

/// Builder for `StreamProcessConfig`
#[derive(Debug)]
pub struct StreamProcessConfigBuilder {
    config: StreamProcessConfig,
}

impl StreamProcessConfigBuilder {
    /// Set leading arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set a fixed session id
    #[must_use]
    pub fn session_id(mut self, id: impl Into<SessionId>) -> Self {
        self.config.session_id = Some(id.into());
        self
    }

    /// Set the tooling (MCP) configuration file
    #[must_use]
    pub fn mcp_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mcp_config = Some(path.into());
        self
    }

    /// Set working directory
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cwd = Some(path.into());
        self
    }

    /// Set standing instructions
    #[must_use]
    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.config.instructions = Some(text.into());
        self
    }

    /// Set model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Add an environment variable for the child
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// Add an extra CLI flag; dropped at launch unless allow-listed
    #[must_use]
    pub fn extra_arg(mut self, flag: impl Into<String>, value: Option<String>) -> Self {
        self.config.extra_args.push((flag.into(), value));
        self
    }

    /// Toggle `--dangerously-skip-permissions`
    #[must_use]
    pub const fn skip_permissions(mut self, skip: bool) -> Self {
        self.config.skip_permissions = skip;
        self
    }

    /// Set reply deadline
    #[must_use]
    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Set coalescing window
    #[must_use]
    pub const fn gather_window(mut self, window: Duration) -> Self {
        self.config.gather_window = window;
        self
    }

    /// Set coalescing idle gap
    #[must_use]
    pub const fn gather_idle(mut self, idle: Duration) -> Self {
        self.config.gather_idle = idle;
        self
    }

    /// Set maximum protocol line length
    #[must_use]
    pub const fn max_line_length(mut self, max: usize) -> Self {
        self.config.max_line_length = max;
        self
    }

    /// Set readiness policy
    #[must_use]
    pub const fn readiness(mut self, policy: ReadinessPolicy) -> Self {
        self.config.readiness = policy;
        self
    }

    /// Set restart policy
    #[must_use]
    pub const fn restart(mut self, policy: RestartPolicy) -> Self {
        self.config.restart = policy;
        self
    }

    /// Build the config
    #[must_use]
    pub fn build(self) -> StreamProcessConfig {
        self.config
    }
}

// ============================================================================
// Worker Config
// ============================================================================

/// How a worker builds provider context
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// System instruction passed to every `generate` call
    pub system_prompt: String,
    /// Number of most recent stored turns considered as context
    pub context_window: usize,
    /// Append a `system` start-up turn before processing mail
    pub announce: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            announce: true,
        }
    }
}

impl WorkerConfig {
    /// Set system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set context window; values below 1 are raised to 1 so the latest
    /// user turn always reaches the provider
    #[must_use]
    pub const fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = if window == 0 { 1 } else { window };
        self
    }

    /// Toggle the start-up announcement turn
    #[must_use]
    pub const fn with_announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }
}

//! Process-level settings loaded from the environment
//!
//! The core types never read the environment themselves; the binary builds a
//! [`Settings`] once and turns it into explicit configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};
use crate::provider::{CommandProvider, Provider, ProviderBinding};
use crate::types::options::{DEFAULT_CONTEXT_WINDOW, StreamProcessConfig, WorkerConfig};

/// Which provider new agents are bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Persistent line-JSON child process per agent
    StreamProcess,
    /// One command invocation per turn
    Command,
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI chat completions
    OpenAi,
}

impl std::str::FromStr for ProviderKind {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream-process" | "stream" | "claude-cli" => Ok(Self::StreamProcess),
            "command" | "cmd" => Ok(Self::Command),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "oai" => Ok(Self::OpenAi),
            other => Err(OrchestratorError::invalid_config(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider for new agents
    pub provider: ProviderKind,
    /// Name of the agent the console binary spawns
    pub agent_name: String,
    /// System prompt passed to every `generate` call
    pub system_prompt: String,
    /// Number of stored turns used as context
    pub context_window: usize,
    /// Streaming CLI executable
    pub cli_bin: String,
    /// Tooling configuration file for the streaming CLI
    pub mcp_config: Option<PathBuf>,
    /// Working directory for provider processes
    pub project_dir: Option<PathBuf>,
    /// Standing instructions prepended to the first turn
    pub instructions: Option<String>,
    /// Streaming reply deadline
    pub response_timeout: Duration,
    /// Command line of the command provider, whitespace separated
    pub provider_cmd: Option<String>,
    /// Command provider per-turn timeout
    pub provider_timeout: Duration,
    /// Model override
    pub model: Option<String>,
    /// Launch the streaming CLI with `--dangerously-skip-permissions`
    pub skip_permissions: bool,
    /// Anthropic API key
    pub anthropic_api_key: Option<String>,
    /// OpenAI API key
    pub openai_api_key: Option<String>,
}

impl Settings {
    /// Load settings from process environment variables
    ///
    /// # Errors
    /// Returns `InvalidConfig` for unparseable values
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for unparseable values
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("ORCHESTRATOR_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::StreamProcess,
        };

        Ok(Self {
            provider,
            agent_name: get("ORCHESTRATOR_AGENT_NAME").unwrap_or_else(|| "assistant".to_string()),
            system_prompt: get("ORCHESTRATOR_SYSTEM_PROMPT").unwrap_or_default(),
            context_window: parse_context_window(&get)?,
            cli_bin: get("ORCHESTRATOR_CLI_BIN").unwrap_or_else(|| "claude".to_string()),
            mcp_config: get("ORCHESTRATOR_MCP_CONFIG").map(PathBuf::from),
            project_dir: get("ORCHESTRATOR_PROJECT_DIR").map(PathBuf::from),
            instructions: get("ORCHESTRATOR_INSTRUCTIONS"),
            response_timeout: parse_number(&get, "ORCHESTRATOR_RESPONSE_TIMEOUT_SECS")?
                .map_or(crate::types::options::DEFAULT_RESPONSE_TIMEOUT, Duration::from_secs),
            provider_cmd: get("ORCHESTRATOR_PROVIDER_CMD"),
            provider_timeout: parse_number(&get, "ORCHESTRATOR_PROVIDER_TIMEOUT_SECS")?
                .map_or(crate::provider::command::DEFAULT_COMMAND_TIMEOUT, Duration::from_secs),
            model: get("ORCHESTRATOR_MODEL"),
            skip_permissions: parse_flag(&get, "ORCHESTRATOR_SKIP_PERMISSIONS")?.unwrap_or(false),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
        })
    }

    /// Worker settings for new agents
    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::default()
            .with_system_prompt(self.system_prompt.clone())
            .with_context_window(self.context_window)
    }

    /// Streaming provider configuration
    #[must_use]
    pub fn stream_config(&self) -> StreamProcessConfig {
        let mut builder = StreamProcessConfig::builder(&self.cli_bin)
            .response_timeout(self.response_timeout)
            .skip_permissions(self.skip_permissions);
        if let Some(ref path) = self.mcp_config {
            builder = builder.mcp_config(path.clone());
        }
        if let Some(ref dir) = self.project_dir {
            builder = builder.cwd(dir.clone());
        }
        if let Some(ref text) = self.instructions {
            builder = builder.instructions(text.clone());
        }
        if let Some(ref model) = self.model {
            builder = builder.model(model.clone());
        }
        builder.build()
    }

    /// Turn the settings into a provider binding
    ///
    /// Stateless providers are built once here so configuration errors
    /// surface immediately; the streaming provider is dedicated per agent.
    ///
    /// # Errors
    /// Returns `InvalidConfig`, `CliNotFound` or `MissingCredential`
    pub fn provider_binding(&self) -> Result<ProviderBinding> {
        match self.provider {
            ProviderKind::StreamProcess => {
                // Fail fast on a missing binary instead of at first spawn
                crate::provider::StreamProcessProvider::new(self.stream_config())?;
                Ok(ProviderBinding::stream_process(self.stream_config()))
            }
            ProviderKind::Command => {
                let line = self.provider_cmd.as_deref().ok_or_else(|| {
                    OrchestratorError::invalid_config("ORCHESTRATOR_PROVIDER_CMD is not set")
                })?;
                let mut parts = line.split_whitespace();
                let program = parts.next().ok_or_else(|| {
                    OrchestratorError::invalid_config("ORCHESTRATOR_PROVIDER_CMD is empty")
                })?;
                let mut provider =
                    CommandProvider::new(program, parts)?.with_timeout(self.provider_timeout);
                if let Some(ref dir) = self.project_dir {
                    provider = provider.with_cwd(dir.clone());
                }
                if let Some(ref model) = self.model {
                    provider = provider.with_model(model.clone());
                }
                Ok(shared(provider))
            }
            #[cfg(feature = "http")]
            ProviderKind::Anthropic => Ok(shared(crate::provider::AnthropicProvider::new(
                self.anthropic_api_key.clone(),
                self.model.clone(),
            )?)),
            #[cfg(feature = "http")]
            ProviderKind::OpenAi => Ok(shared(crate::provider::OpenAiProvider::new(
                self.openai_api_key.clone(),
                self.model.clone(),
            )?)),
            #[cfg(not(feature = "http"))]
            ProviderKind::Anthropic | ProviderKind::OpenAi => Err(OrchestratorError::invalid_config(
                "HTTP providers require the `http` feature",
            )),
        }
    }
}

fn shared(provider: impl Provider + 'static) -> ProviderBinding {
    let provider: Arc<dyn Provider> = Arc::new(provider);
    ProviderBinding::shared(provider)
}

fn parse_number<F>(get: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| {
            v.trim().parse::<u64>().map_err(|_| {
                OrchestratorError::invalid_config(format!("{key} must be a non-negative integer"))
            })
        })
        .transpose()
}

fn parse_context_window<F>(get: &F) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    const KEY: &str = "ORCHESTRATOR_CONTEXT_WINDOW";
    match parse_number(get, KEY)? {
        None => Ok(DEFAULT_CONTEXT_WINDOW),
        Some(0) => Err(OrchestratorError::invalid_config(format!(
            "{KEY} must be at least 1"
        ))),
        Some(n) => usize::try_from(n).map_err(|_| {
            OrchestratorError::invalid_config(format!("{KEY} is too large: {n}"))
        }),
    }
}

fn parse_flag<F>(get: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(OrchestratorError::invalid_config(format!(
                "{key} must be true or false"
            ))),
        })
        .transpose()
}

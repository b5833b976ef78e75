//! Providers: anything that turns a system prompt plus history into reply text
//!
//! Every provider is used behind `Arc<dyn Provider>`, so `generate` returns a
//! boxed future. A provider may be shared by several workers; implementations
//! serialize access internally where they hold state.

pub mod command;
#[cfg(feature = "http")]
pub mod http;
pub mod stream;

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::types::messages::ChatMessage;
use crate::types::options::StreamProcessConfig;

pub use command::CommandProvider;
#[cfg(feature = "http")]
pub use http::{AnthropicProvider, OpenAiProvider};
pub use stream::StreamProcessProvider;

/// Reply generator used by agent workers
pub trait Provider: Send + Sync {
    /// Short provider name, recorded with the agent
    fn name(&self) -> &str;

    /// Produce the reply to the latest user message in `history`
    ///
    /// `history` holds user and assistant messages, oldest first.
    ///
    /// # Errors
    /// Implementation specific; workers render any error as a reply text
    fn generate<'a>(
        &'a self,
        system: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String>>;

    /// Release external resources; called once by the owning worker on exit
    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

type ProviderFactory = Box<dyn FnOnce() -> Result<Arc<dyn Provider>> + Send>;

/// How an agent obtains its provider
pub enum ProviderBinding {
    /// Use an existing provider, possibly shared with other agents
    Shared(Arc<dyn Provider>),
    /// Build a provider owned by this agent alone; it is shut down when the
    /// agent's worker exits
    Dedicated(ProviderFactory),
}

impl ProviderBinding {
    /// Bind an existing provider
    #[must_use]
    pub fn shared(provider: Arc<dyn Provider>) -> Self {
        Self::Shared(provider)
    }

    /// Bind a provider built by `factory` when the agent spawns
    pub fn dedicated<F>(factory: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn Provider>> + Send + 'static,
    {
        Self::Dedicated(Box::new(factory))
    }

    /// Dedicated streaming process provider
    #[must_use]
    pub fn stream_process(config: StreamProcessConfig) -> Self {
        Self::dedicated(move || {
            let provider: Arc<dyn Provider> = Arc::new(StreamProcessProvider::new(config)?);
            Ok(provider)
        })
    }

    /// Resolve into a provider and whether the caller owns it
    ///
    /// # Errors
    /// Returns the factory's error for dedicated bindings
    pub fn resolve(self) -> Result<(Arc<dyn Provider>, bool)> {
        match self {
            Self::Shared(provider) => Ok((provider, false)),
            Self::Dedicated(factory) => Ok((factory()?, true)),
        }
    }
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(provider) => f.debug_tuple("Shared").field(&provider.name()).finish(),
            Self::Dedicated(_) => f.write_str("Dedicated"),
        }
    }
}

/// Reply text stored when `generate` fails
#[must_use]
pub fn error_reply(error: &crate::error::OrchestratorError) -> String {
    format!("[error: {error}]")
}

/// In-band replies of the streaming process provider
///
/// These are returned as ordinary reply text so a conversation never stalls;
/// all of them start with [`Sentinel::PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentinel {
    /// No reply arrived before the deadline
    Timeout(Duration),
    /// The child exited
    Exited {
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Last stderr line or error event, if any
        diagnostic: Option<String>,
    },
    /// No reply, but the child wrote to stderr
    Diagnostic(String),
    /// The user turn could not be written
    WriteFailed(String),
    /// The child could not be started
    SpawnFailed(String),
    /// The child reported an error event
    ErrorEvent(String),
}

impl Sentinel {
    /// Common prefix of every sentinel text
    pub const PREFIX: &'static str = "[stream-process ";
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(after) => {
                write!(f, "{}timeout after {}s]", Self::PREFIX, after.as_secs_f64())
            }
            Self::Exited { code, diagnostic } => {
                match code {
                    Some(code) => write!(f, "{}exited with code {code}]", Self::PREFIX)?,
                    None => write!(f, "{}exited by signal]", Self::PREFIX)?,
                }
                if let Some(diagnostic) = diagnostic {
                    write!(f, ": {diagnostic}")?;
                }
                Ok(())
            }
            Self::Diagnostic(message) => write!(f, "{}stderr] {message}", Self::PREFIX),
            Self::WriteFailed(message) => write!(f, "{}write error] {message}", Self::PREFIX),
            Self::SpawnFailed(message) => write!(f, "{}not running] {message}", Self::PREFIX),
            Self::ErrorEvent(message) => write!(f, "{}error] {message}", Self::PREFIX),
        }
    }
}

/// Whether a reply text is a streaming provider sentinel
#[must_use]
pub fn is_sentinel(text: &str) -> bool {
    text.starts_with(Sentinel::PREFIX)
}

//! Agent worker: one mailbox, one task, strictly ordered turns

use futures::FutureExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{OrchestratorError, Result};
use crate::history::HistoryStore;
use crate::provider::Provider;
use crate::types::identifiers::{AgentId, ConversationId};
use crate::types::options::WorkerConfig;

use super::background::{WorkerContext, spawn_worker_loop};

/// Callback invoked once per completed turn with the agent and reply text
pub type ReplyCallback = Arc<dyn Fn(AgentId, &str) + Send + Sync>;

/// Processing state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Waiting for mail
    Idle,
    /// Handling one turn
    Processing,
    /// Loop has exited
    Stopped,
}

impl WorkerState {
    pub(super) const fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Processing => 1,
            Self::Stopped => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Processing,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Shared, lock-free worker state cell
#[derive(Debug, Clone, Default)]
pub(super) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: WorkerState) {
        self.0.store(state.to_u8(), Ordering::SeqCst);
    }
}

/// Everything a worker needs to run
pub struct WorkerSpec {
    /// Agent identity
    pub agent: AgentId,
    /// Agent name, used in the start-up announcement and logs
    pub name: String,
    /// Conversation the worker appends to
    pub conversation: ConversationId,
    /// Turn storage
    pub store: Arc<dyn HistoryStore>,
    /// Reply generator
    pub provider: Arc<dyn Provider>,
    /// Shut the provider down when the worker exits
    pub owns_provider: bool,
    /// Prompt and context settings
    pub config: WorkerConfig,
    /// Optional reply delivery
    pub on_reply: Option<ReplyCallback>,
}

/// Handle to a running worker
///
/// `submit` never blocks. `stop` lets an in-flight turn finish and leaves the
/// rest of the mailbox untouched; `join` returns those leftover texts.
pub struct WorkerHandle {
    agent: AgentId,
    conversation: ConversationId,
    mailbox: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    state: StateCell,
    task: JoinHandle<Vec<String>>,
}

impl WorkerHandle {
    /// Start the worker task
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(spec: WorkerSpec) -> Self {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let state = StateCell::default();

        let agent = spec.agent;
        let conversation = spec.conversation;
        let task = spawn_worker_loop(
            inbox,
            WorkerContext {
                spec,
                cancel: cancel.clone(),
                state: state.clone(),
            },
        );

        Self {
            agent,
            conversation,
            mailbox,
            cancel,
            state,
            task,
        }
    }

    /// Agent identity
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// Conversation the worker appends to
    #[must_use]
    pub const fn conversation(&self) -> ConversationId {
        self.conversation
    }

    /// Enqueue one user text
    ///
    /// # Errors
    /// Returns `AgentStopped` once `stop` was called or the task has ended
    pub fn submit(&self, text: impl Into<String>) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(OrchestratorError::AgentStopped(self.agent));
        }
        self.mailbox
            .send(text.into())
            .map_err(|_| OrchestratorError::AgentStopped(self.agent))
    }

    /// Ask the worker to exit after its current turn; idempotent
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether `stop` has been requested
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current processing state
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Whether the worker task is still running
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }

    /// Collect the result of a task that already ended, without waiting
    ///
    /// Returns `None` while the task is still running.
    pub fn try_join(&mut self) -> Option<Result<Vec<String>>> {
        if !self.task.is_finished() {
            return None;
        }
        let agent = self.agent;
        (&mut self.task).now_or_never().map(|joined| {
            joined.map_err(|e| OrchestratorError::WorkerPanicked(format!("{agent}: {e}")))
        })
    }

    /// Wait for the task to end and collect undelivered mail
    ///
    /// Does not stop the worker by itself; call `stop` first.
    ///
    /// # Errors
    /// Returns `WorkerPanicked` if the task panicked or was aborted
    pub async fn join(self) -> Result<Vec<String>> {
        self.task
            .await
            .map_err(|e| OrchestratorError::WorkerPanicked(format!("{}: {e}", self.agent)))
    }
}

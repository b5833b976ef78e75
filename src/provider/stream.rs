//! Provider backed by one persistent line-JSON child process
//!
//! The child is launched lazily on the first `generate` call and keeps its
//! own conversation state, keyed by the session id. Each call writes only the
//! latest user message and collects the chunks that arrive after the write.
//! Operational failures come back as [`Sentinel`] texts, never as errors.

use futures::future::BoxFuture;
use std::path::Path;
use std::process::ExitStatus;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{OrchestratorError, Result};
use crate::message::outbound::{user_turn_line, with_instructions};
use crate::transport::subprocess::{EXIT_GRACE, PhaseCell, ProcessSession, ProviderPhase};
use crate::types::identifiers::SessionId;
use crate::types::messages::{ChatMessage, Role};
use crate::types::options::{ReadinessPolicy, RestartPolicy, StreamProcessConfig};

use super::{Provider, Sentinel};

struct ProviderState {
    session: Option<ProcessSession>,
    instructions_sent: bool,
    restarts: u32,
}

/// Streaming process provider
///
/// One instance owns at most one child at a time. The internal lock is held
/// for a whole `generate` call, so overlapping calls on one instance never
/// interleave their writes or steal each other's chunks.
pub struct StreamProcessProvider {
    config: StreamProcessConfig,
    session_id: SessionId,
    phase: PhaseCell,
    state: Mutex<ProviderState>,
}

impl StreamProcessProvider {
    /// Create a provider; the child is not started until the first call
    ///
    /// # Errors
    /// Returns `CliNotFound` if the program cannot be located and
    /// `InvalidConfig` if the working directory does not exist
    pub fn new(config: StreamProcessConfig) -> Result<Self> {
        check_program(&config.program)?;

        if let Some(ref cwd) = config.cwd
            && !cwd.is_dir()
        {
            return Err(OrchestratorError::invalid_config(format!(
                "Working directory does not exist: {}",
                cwd.display()
            )));
        }

        let session_id = config.session_id.clone().unwrap_or_else(SessionId::generate);

        Ok(Self {
            config,
            session_id,
            phase: PhaseCell::default(),
            state: Mutex::new(ProviderState {
                session: None,
                instructions_sent: false,
                restarts: 0,
            }),
        })
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> ProviderPhase {
        self.phase.get()
    }

    /// Session id sent with every turn
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// How many times a dead child was replaced
    pub async fn restarts(&self) -> u32 {
        self.state.lock().await.restarts
    }

    /// Stop the child, if any
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut session) = state.session.take() {
            session.close().await;
            log::info!("[{}] stream provider closed", self.session_id.short());
        }
        if self.phase.get() != ProviderPhase::NotStarted {
            self.phase.set(ProviderPhase::Exited);
        }
    }

    fn start_session(&self) -> Result<ProcessSession> {
        self.phase.set(ProviderPhase::Starting);
        ProcessSession::start(&self.config, self.session_id.clone(), self.phase.clone())
    }

    /// Make sure a live child exists, restarting per policy
    ///
    /// Returns `Err(sentinel text)` when no usable child can be had.
    async fn ensure_session<'s>(
        &self,
        state: &'s mut ProviderState,
    ) -> std::result::Result<&'s mut ProcessSession, String> {
        let mut fresh = false;

        if let Some(session) = state.session.as_mut()
            && let Some(status) = session.exit_status()
        {
            match self.config.restart {
                RestartPolicy::Never => {
                    self.phase.set(ProviderPhase::Exited);
                    return Err(exited_sentinel(session, status).await);
                }
                RestartPolicy::OnNextCall => {
                    log::warn!(
                        "[{}] child exited ({status}), restarting",
                        self.session_id.short()
                    );
                    if let Some(mut dead) = state.session.take() {
                        dead.close().await;
                    }
                    state.restarts += 1;
                }
            }
        }

        if state.session.is_none() {
            match self.start_session() {
                Ok(session) => {
                    state.session = Some(session);
                    fresh = true;
                }
                Err(e) => {
                    log::error!("[{}] failed to start child: {e}", self.session_id.short());
                    self.phase.set(ProviderPhase::Exited);
                    return Err(Sentinel::SpawnFailed(e.to_string()).to_string());
                }
            }
        }

        let session = state
            .session
            .as_mut()
            .ok_or_else(|| Sentinel::SpawnFailed("no session".to_string()).to_string())?;

        if fresh
            && let ReadinessPolicy::Await(wait) = self.config.readiness
            && !session.wait_ready(wait).await
        {
            log::debug!(
                "[{}] no init event within {wait:?}, sending anyway",
                self.session_id.short()
            );
        }

        Ok(session)
    }

    async fn generate_inner(&self, history: &[ChatMessage]) -> Result<String> {
        let user_text = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .ok_or(OrchestratorError::EmptyPrompt)?;

        let mut state = self.state.lock().await;

        let instructions = match self.config.instructions.as_deref() {
            Some(text) if !state.instructions_sent && !text.trim().is_empty() => Some(text),
            _ => None,
        };
        let content = match instructions {
            Some(text) => with_instructions(text, user_text),
            None => user_text.to_string(),
        };
        let line = user_turn_line(&content, &self.session_id)?;

        let session = match self.ensure_session(&mut *state).await {
            Ok(session) => session,
            Err(sentinel) => return Ok(sentinel),
        };

        let stale = session.drain_stale();
        if stale > 0 {
            log::debug!(
                "[{}] discarded {stale} stale chunk(s)",
                self.session_id.short()
            );
        }

        if let Err(e) = session.write_line(&line).await {
            let reply = match session.wait_exit(EXIT_GRACE).await {
                Some(status) => exited_sentinel(session, status).await,
                None => Sentinel::WriteFailed(e.to_string()).to_string(),
            };
            self.phase.set(ProviderPhase::Exited);
            return Ok(reply);
        }
        if instructions.is_some() {
            state.instructions_sent = true;
        }

        // Re-borrow after touching state
        let Some(session) = state.session.as_mut() else {
            return Ok(Sentinel::SpawnFailed("no session".to_string()).to_string());
        };

        self.phase.set(ProviderPhase::AwaitingReply);
        let deadline = Instant::now() + self.config.response_timeout;
        let collected = session
            .collect_reply(deadline, self.config.gather_window, self.config.gather_idle)
            .await;

        let exited = if collected.closed {
            session.wait_exit(EXIT_GRACE).await
        } else {
            session.exit_status()
        };
        self.phase.set(if exited.is_some() {
            ProviderPhase::Exited
        } else {
            ProviderPhase::Ready
        });

        if !collected.parts.is_empty() {
            return Ok(collected.parts.concat());
        }

        let reply = if let Some(status) = exited {
            exited_sentinel(session, status).await
        } else if let Some(diagnostic) = session.last_error() {
            Sentinel::Diagnostic(diagnostic).to_string()
        } else {
            Sentinel::Timeout(self.config.response_timeout).to_string()
        };
        log::warn!("[{}] no reply: {reply}", self.session_id.short());
        Ok(reply)
    }
}

impl Provider for StreamProcessProvider {
    fn name(&self) -> &str {
        "stream-process"
    }

    fn generate<'a>(
        &'a self,
        _system: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.generate_inner(history))
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.close())
    }
}

/// Exit sentinel including the child's last diagnostic
async fn exited_sentinel(session: &mut ProcessSession, status: ExitStatus) -> String {
    session.settle_stderr(EXIT_GRACE).await;
    Sentinel::Exited {
        code: status.code(),
        diagnostic: session.last_error(),
    }
    .to_string()
}

/// Locate the program: bare names through `PATH`, paths must exist
fn check_program(program: &Path) -> Result<()> {
    let display = program.display().to_string();
    if program.components().count() > 1 || program.is_absolute() {
        if program.exists() {
            return Ok(());
        }
        return Err(OrchestratorError::cli_not_found(display));
    }
    which::which(program)
        .map(|_| ())
        .map_err(|_| OrchestratorError::cli_not_found(display))
}

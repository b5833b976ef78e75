//! One running streaming child process and its event pipeline

use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{OrchestratorError, Result};
use crate::types::identifiers::SessionId;

use super::reader::LastError;

/// Chunks collected for one reply
#[derive(Debug, Default)]
pub struct Collected {
    /// Text chunks in arrival order
    pub parts: Vec<String>,
    /// Stdout reached EOF while waiting
    pub closed: bool,
}

/// A live child process speaking line-JSON on stdin/stdout
///
/// Owns the only receiver of the text queue, so exactly one `generate` call
/// (the one holding the provider lock) consumes reply chunks at a time.
pub struct ProcessSession {
    pub(super) session_id: SessionId,
    pub(super) child: Child,
    pub(super) stdin: Option<ChildStdin>,
    pub(super) text_rx: mpsc::UnboundedReceiver<String>,
    pub(super) ready_rx: watch::Receiver<bool>,
    pub(super) last_error: LastError,
    pub(super) exit: Option<ExitStatus>,
    pub(super) reader_task: Option<JoinHandle<()>>,
    pub(super) stderr_task: Option<JoinHandle<()>>,
}

impl ProcessSession {
    /// Session id the child was launched with
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// OS process id, if still known
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the child has sent its init event
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Wait up to `timeout` for the init event
    ///
    /// Returns `false` on timeout or if stdout closed first.
    pub async fn wait_ready(&mut self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.ready_rx.wait_for(|ready| *ready)).await,
            Ok(Ok(_))
        )
    }

    /// Last stderr line or error event text
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Exit status without waiting; `None` while the child runs
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        if self.exit.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.exit = status,
                Err(e) => log::warn!("[{}] try_wait failed: {}", self.session_id.short(), e),
            }
        }
        self.exit
    }

    /// Wait up to `grace` for the child to exit
    pub async fn wait_exit(&mut self, grace: Duration) -> Option<ExitStatus> {
        if self.exit.is_none()
            && let Ok(Ok(status)) = tokio::time::timeout(grace, self.child.wait()).await
        {
            self.exit = Some(status);
        }
        self.exit
    }

    /// Give the stderr reader up to `grace` to reach EOF
    ///
    /// Call after the child exited so its last diagnostic line is captured.
    pub async fn settle_stderr(&mut self, grace: Duration) {
        if let Some(task) = self.stderr_task.as_mut()
            && tokio::time::timeout(grace, task).await.is_ok()
        {
            self.stderr_task = None;
        }
    }

    /// Discard chunks left over from earlier replies
    ///
    /// Returns the number of discarded chunks.
    pub fn drain_stale(&mut self) -> usize {
        let mut drained = 0;
        while self.text_rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }

    /// Write one protocol line to the child's stdin
    ///
    /// # Errors
    /// Returns `OrchestratorError::Transport` if stdin is closed or the pipe broke
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| OrchestratorError::transport("stdin not available"))?;

        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| OrchestratorError::transport(format!("Failed to write to stdin: {e}")))?;

        stdin
            .flush()
            .await
            .map_err(|e| OrchestratorError::transport(format!("Failed to flush stdin: {e}")))?;

        Ok(())
    }

    /// Collect the reply to the turn just written
    ///
    /// Waits until `deadline` for a first chunk, then keeps collecting for at
    /// most `gather_window`, stopping early after `gather_idle` of silence.
    pub async fn collect_reply(
        &mut self,
        deadline: Instant,
        gather_window: Duration,
        gather_idle: Duration,
    ) -> Collected {
        let mut collected = Collected::default();

        match tokio::time::timeout_at(deadline, self.text_rx.recv()).await {
            Ok(Some(chunk)) => collected.parts.push(chunk),
            Ok(None) => {
                collected.closed = true;
                return collected;
            }
            Err(_) => return collected,
        }

        let gather_deadline = Instant::now() + gather_window;
        loop {
            let remaining = gather_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining.min(gather_idle), self.text_rx.recv()).await {
                Ok(Some(chunk)) => collected.parts.push(chunk),
                Ok(None) => {
                    collected.closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        collected
    }
}

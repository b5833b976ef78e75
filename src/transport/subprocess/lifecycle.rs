//! Lifecycle management for a process session (start, close, drop)

use std::process::Stdio;

use crate::VERSION;
use crate::error::{OrchestratorError, Result};
use crate::types::identifiers::SessionId;
use crate::types::options::StreamProcessConfig;

use super::command::CommandBuilder;
use super::config::{CLOSE_TIMEOUT, DANGEROUS_ENV_VARS};
use super::phase::PhaseCell;
use super::reader::{EventSink, LastError, spawn_stderr_reader, spawn_stdout_reader};
use super::session::ProcessSession;

impl ProcessSession {
    /// Launch the child and start its reader tasks
    ///
    /// The session is usable immediately; readiness is only advisory.
    ///
    /// # Errors
    /// Returns `OrchestratorError::Connection` if the process cannot be spawned
    /// or its stdio handles cannot be obtained
    pub fn start(
        config: &StreamProcessConfig,
        session_id: SessionId,
        phase: PhaseCell,
    ) -> Result<Self> {
        let mut cmd = CommandBuilder::new(config, &session_id).build();

        // Only pass user-provided env vars that are not in the dangerous list
        for (key, value) in &config.env {
            if DANGEROUS_ENV_VARS.contains(&key.as_str()) {
                log::warn!("Refusing to pass {key} to child process");
                continue;
            }
            cmd.env(key, value);
        }
        cmd.env("ORCHESTRATOR_VERSION", VERSION);
        if let Some(ref cwd) = config.cwd {
            cmd.env("PWD", cwd);
        }

        // Pipe stderr instead of inheriting so the child cannot touch our terminal
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if let Some(ref cwd) = config.cwd
                && !cwd.exists()
            {
                return OrchestratorError::connection(format!(
                    "Working directory does not exist: {}",
                    cwd.display()
                ));
            }
            OrchestratorError::connection(format!(
                "Failed to start {}: {e}",
                config.program.display()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| OrchestratorError::connection("Failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OrchestratorError::connection("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OrchestratorError::connection("Failed to get stderr handle"))?;

        let label = session_id.short().to_string();
        let last_error = LastError::default();
        let (text_tx, text_rx) = tokio::sync::mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = tokio::sync::watch::channel(false);

        let reader_task = spawn_stdout_reader(
            stdout,
            config.max_line_length,
            EventSink {
                text_tx,
                ready_tx,
                last_error: last_error.clone(),
                phase,
                label: label.clone(),
            },
        );
        let stderr_task = spawn_stderr_reader(
            stderr,
            config.max_line_length,
            last_error.clone(),
            label.clone(),
        );

        log::info!(
            "[{label}] started {} (pid {:?})",
            config.program.display(),
            child.id()
        );

        Ok(Self {
            session_id,
            child,
            stdin: Some(stdin),
            text_rx,
            ready_rx,
            last_error,
            exit: None,
            reader_task: Some(reader_task),
            stderr_task: Some(stderr_task),
        })
    }

    /// Close stdin, give the child time to exit, then kill it
    pub async fn close(&mut self) {
        // Dropping stdin signals EOF to the child
        drop(self.stdin.take());

        if self.exit.is_none() {
            match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
                Ok(Ok(status)) => self.exit = Some(status),
                Ok(Err(e)) => {
                    log::warn!("[{}] wait failed: {}", self.session_id.short(), e);
                }
                Err(_) => {
                    log::warn!(
                        "[{}] child did not exit within {:?}, killing",
                        self.session_id.short(),
                        CLOSE_TIMEOUT
                    );
                    let _ = self.child.kill().await;
                    self.exit = self.child.try_wait().ok().flatten();
                }
            }
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        log::debug!("[{}] session closed", self.session_id.short());
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        drop(self.stdin.take());

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        if self.exit.is_none() {
            let _ = self.child.start_kill();
        }
    }
}

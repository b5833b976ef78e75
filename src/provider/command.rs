//! Stateless provider running one command per turn
//!
//! The request `{system, messages, model}` is written to the child's stdin as
//! one JSON document. Stdout is either a JSON object with a `text` field or
//! plain reply text.

use futures::future::BoxFuture;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{OrchestratorError, Result};
use crate::types::messages::ChatMessage;

use super::Provider;

/// Default per-turn timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Serialize)]
struct CommandRequest<'a> {
    system: &'a str,
    messages: &'a [ChatMessage],
    model: Option<&'a str>,
}

/// One-shot subprocess provider
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    model: Option<String>,
    timeout: Duration,
}

impl CommandProvider {
    /// Create a provider running `program` with `args`
    ///
    /// # Errors
    /// Returns `CliNotFound` if the program is not on `PATH` and not an
    /// existing path
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let found = program.exists() || which::which(&program).is_ok();
        if !found {
            return Err(OrchestratorError::cli_not_found(
                program.display().to_string(),
            ));
        }

        Ok(Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            model: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    /// Set per-turn timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the model name passed in the request
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    async fn run(&self, system: &str, history: &[ChatMessage]) -> Result<String> {
        let request = serde_json::to_vec(&CommandRequest {
            system,
            messages: history,
            model: self.model.as_deref(),
        })?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| {
            OrchestratorError::connection(format!(
                "Failed to start {}: {e}",
                self.program.display()
            ))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that ignores stdin may close it early
            if let Err(e) = stdin.write_all(&request).await {
                log::debug!("command provider stdin write failed: {e}");
            }
            drop(stdin);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                OrchestratorError::timeout(format!(
                    "{} did not finish within {:?}",
                    self.program.display(),
                    self.timeout
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(OrchestratorError::process(
                format!("{} failed", self.program.display()),
                output.status.code().unwrap_or(-1),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        Ok(reply_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract the reply from command output
fn reply_text(stdout: &str) -> String {
    let trimmed = stdout.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed)
        && let Some(text) = map.get("text")
    {
        return match text {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
    }
    trimmed.to_string()
}

impl Provider for CommandProvider {
    fn name(&self) -> &str {
        "command"
    }

    fn generate<'a>(
        &'a self,
        system: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.run(system, history))
    }
}

//! CLI command building logic for subprocess transport

use tokio::process::Command;

use crate::types::identifiers::SessionId;
use crate::types::options::StreamProcessConfig;

use super::config::ALLOWED_EXTRA_FLAGS;

/// Command builder for a streaming line-JSON child
pub struct CommandBuilder<'a> {
    config: &'a StreamProcessConfig,
    session_id: &'a SessionId,
}

impl<'a> CommandBuilder<'a> {
    /// Create a new command builder
    #[must_use]
    pub fn new(config: &'a StreamProcessConfig, session_id: &'a SessionId) -> Self {
        Self { config, session_id }
    }

    /// Build the complete command with all arguments
    ///
    /// Stdio and environment are left to the caller.
    #[must_use]
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args);

        // Protocol flags
        cmd.arg("-p")
            .arg("--verbose")
            .arg("--input-format")
            .arg("stream-json")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--session-id")
            .arg(self.session_id.as_str());

        self.add_configuration_args(&mut cmd);
        self.add_extra_args(&mut cmd);

        if let Some(ref cwd) = self.config.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Add model, tooling and permission arguments
    fn add_configuration_args(&self, cmd: &mut Command) {
        if self.config.skip_permissions {
            cmd.arg("--dangerously-skip-permissions");
        }

        if let Some(ref model) = self.config.model {
            cmd.arg("--model").arg(model);
        }

        if let Some(ref path) = self.config.mcp_config {
            cmd.arg("--mcp-config").arg(path);
        }
    }

    /// Add allow-listed extra arguments
    fn add_extra_args(&self, cmd: &mut Command) {
        for (flag, value) in &self.config.extra_args {
            if !ALLOWED_EXTRA_FLAGS.contains(&flag.as_str()) {
                log::warn!("Ignoring extra flag --{flag}: not allow-listed");
                continue;
            }
            if let Some(v) = value {
                cmd.arg(format!("--{flag}")).arg(v);
            } else {
                cmd.arg(format!("--{flag}"));
            }
        }
    }
}

//! Agent spawning

use crate::error::Result;
use crate::history::AgentStatus;
use crate::provider::ProviderBinding;
use crate::types::identifiers::AgentId;

use super::super::worker::{WorkerHandle, WorkerSpec};
use super::core::AgentManager;

impl AgentManager {
    /// Spawn a new agent and start its worker
    ///
    /// Resolves the provider binding first, so a configuration error leaves
    /// no agent record behind, then allocates the identity and conversation
    /// in the history store. Names need not be unique.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns the provider's construction error (missing binary, missing
    /// credential) or a storage error
    pub fn spawn(&self, name: &str, binding: ProviderBinding) -> Result<AgentId> {
        let (provider, owns_provider) = binding.resolve()?;

        let agent = self.store.create_agent(name, provider.name())?;
        let conversation = match self.store.create_conversation(agent, &format!("Session {name}")) {
            Ok(conversation) => conversation,
            Err(e) => {
                if let Err(status_err) = self.store.set_agent_status(agent, AgentStatus::Stopped) {
                    log::error!("failed to mark {agent} stopped: {status_err}");
                }
                return Err(e);
            }
        };

        let handle = WorkerHandle::spawn(WorkerSpec {
            agent,
            name: name.to_string(),
            conversation,
            store: self.store.clone(),
            provider,
            owns_provider,
            config: self.config.clone(),
            on_reply: self.on_reply.clone(),
        });

        self.workers.lock().insert(agent, handle);
        log::info!("Spawned {agent} ({name}) on {conversation}");
        Ok(agent)
    }
}

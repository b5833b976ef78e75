//! Submitting mail and stopping agents

use crate::history::AgentStatus;
use crate::types::identifiers::AgentId;

use super::core::AgentManager;

impl AgentManager {
    /// Enqueue `text` for an agent
    ///
    /// Returns `false` if the agent is unknown or already stopped.
    pub fn submit(&self, agent: AgentId, text: &str) -> bool {
        let workers = self.workers.lock();
        let Some(worker) = workers.get(&agent) else {
            log::debug!("submit to unknown {agent}");
            return false;
        };
        match worker.submit(text) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("submit to {agent} failed: {e}");
                false
            }
        }
    }

    /// Stop an agent and remove it from the registry
    ///
    /// The in-flight turn, if any, completes; queued mail stays undelivered.
    /// Returns `false` if the agent is unknown.
    pub fn stop(&self, agent: AgentId) -> bool {
        let Some(worker) = self.workers.lock().remove(&agent) else {
            return false;
        };
        worker.stop();

        if let Err(e) = self.store.set_agent_status(agent, AgentStatus::Stopped) {
            log::error!("failed to mark {agent} stopped: {e}");
        }
        log::info!("Stopped {agent}");

        self.retired.lock().push(worker);
        self.reap_retired();
        true
    }
}

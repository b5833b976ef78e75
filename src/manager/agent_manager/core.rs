//! Core agent manager structure and lifecycle management

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::history::HistoryStore;
use crate::types::identifiers::AgentId;
use crate::types::options::WorkerConfig;

use super::super::worker::{ReplyCallback, WorkerHandle};

/// Registry and lifecycle supervisor for agent workers
///
/// All operations are short registry reads or mutations under one lock;
/// none of them wait on conversation processing.
pub struct AgentManager {
    pub(crate) store: Arc<dyn HistoryStore>,
    pub(crate) config: WorkerConfig,
    pub(crate) on_reply: Option<ReplyCallback>,
    pub(crate) workers: Mutex<HashMap<AgentId, WorkerHandle>>,
    /// Stopped workers not yet joined
    pub(crate) retired: Mutex<Vec<WorkerHandle>>,
    /// Leftover mail of reaped workers, handed out by `shutdown`
    pub(crate) undelivered: Mutex<HashMap<AgentId, Vec<String>>>,
}

impl AgentManager {
    /// Create a manager storing history in `store`
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>, config: WorkerConfig) -> Self {
        Self {
            store,
            config,
            on_reply: None,
            workers: Mutex::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
            undelivered: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver every completed reply to `callback`
    ///
    /// Applies to agents spawned after this call.
    #[must_use]
    pub fn with_reply_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(AgentId, &str) + Send + Sync + 'static,
    {
        self.on_reply = Some(Arc::new(callback));
        self
    }

    /// History store shared by all agents
    #[must_use]
    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Stop every agent and wait for all workers to finish
    ///
    /// Returns the undelivered mail of each agent that had any.
    pub async fn shutdown(&self) -> HashMap<AgentId, Vec<String>> {
        log::info!("Shutting down AgentManager...");

        let ids: Vec<AgentId> = self.workers.lock().keys().copied().collect();
        for id in ids {
            self.stop(id);
        }

        let retired: Vec<WorkerHandle> = std::mem::take(&mut *self.retired.lock());
        let mut undelivered = std::mem::take(&mut *self.undelivered.lock());
        for handle in retired {
            let agent = handle.agent();
            match handle.join().await {
                Ok(leftover) if !leftover.is_empty() => {
                    undelivered.insert(agent, leftover);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Worker {} ended abnormally: {}", agent, e),
            }
        }

        log::info!("AgentManager shutdown complete");
        undelivered
    }

    /// Number of stopped workers whose tasks have not been joined yet
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// Join stopped workers that already finished, keeping their leftover mail
    pub(crate) fn reap_retired(&self) {
        let mut finished = Vec::new();
        self.retired.lock().retain_mut(|handle| match handle.try_join() {
            Some(result) => {
                finished.push((handle.agent(), result));
                false
            }
            None => true,
        });

        for (agent, result) in finished {
            match result {
                Ok(leftover) if !leftover.is_empty() => {
                    self.undelivered.lock().insert(agent, leftover);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Worker {} ended abnormally: {}", agent, e),
            }
        }
    }
}

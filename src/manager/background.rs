//! The worker loop task
//!
//! One task per agent drains the mailbox strictly in order. Each turn stores
//! the user text, asks the provider, and stores the reply; a provider error
//! becomes the stored reply so no user turn is left unanswered.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::provider::error_reply;
use crate::types::messages::Role;

use super::helpers::build_context;
use super::worker::{StateCell, WorkerSpec, WorkerState};

/// State moved into the worker task
pub(super) struct WorkerContext {
    pub spec: WorkerSpec,
    pub cancel: CancellationToken,
    pub state: StateCell,
}

/// Spawn the worker loop
///
/// The task returns texts still queued when it stopped.
pub(super) fn spawn_worker_loop(
    mut inbox: mpsc::UnboundedReceiver<String>,
    ctx: WorkerContext,
) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let spec = &ctx.spec;
        log::info!("[{}] worker started ({})", spec.agent, spec.name);

        if spec.config.announce
            && let Err(e) = spec.store.append(
                spec.conversation,
                Role::System,
                &format!("Agent {} started.", spec.name),
            )
        {
            log::error!("[{}] failed to store announcement: {}", spec.agent, e);
        }

        loop {
            tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => break,
                next = inbox.recv() => match next {
                    Some(text) => process_turn(&ctx, text).await,
                    // Every sender dropped
                    None => break,
                },
            }
        }

        if spec.owns_provider {
            spec.provider.shutdown().await;
        }
        ctx.state.set(WorkerState::Stopped);

        inbox.close();
        let mut leftover = Vec::new();
        while let Ok(text) = inbox.try_recv() {
            leftover.push(text);
        }
        if !leftover.is_empty() {
            log::info!(
                "[{}] worker stopped with {} undelivered message(s)",
                spec.agent,
                leftover.len()
            );
        } else {
            log::info!("[{}] worker stopped", spec.agent);
        }
        leftover
    })
}

/// Handle one user text end to end
async fn process_turn(ctx: &WorkerContext, text: String) {
    let spec = &ctx.spec;
    ctx.state.set(WorkerState::Processing);

    if let Err(e) = spec.store.append(spec.conversation, Role::User, &text) {
        log::error!("[{}] failed to store user turn: {}", spec.agent, e);
    }

    // A zero window would hide the turn just stored
    let window = spec.config.context_window.max(1);
    let history = match spec.store.recent(spec.conversation, window) {
        Ok(turns) => build_context(&turns),
        Err(e) => {
            log::error!("[{}] failed to load context: {}", spec.agent, e);
            Vec::new()
        }
    };

    let reply = match spec
        .provider
        .generate(&spec.config.system_prompt, &history)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            log::warn!("[{}] provider {} failed: {}", spec.agent, spec.provider.name(), e);
            error_reply(&e)
        }
    };

    if let Err(e) = spec.store.append(spec.conversation, Role::Assistant, &reply) {
        log::error!("[{}] failed to store reply: {}", spec.agent, e);
    }

    if let Some(ref on_reply) = spec.on_reply {
        on_reply(spec.agent, &reply);
    }

    ctx.state.set(WorkerState::Idle);
}

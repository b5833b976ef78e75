// Console chat transport
//
// Spawns one agent from environment settings, forwards each stdin line to it
// and prints every reply. On EOF it waits for outstanding replies and exits.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use kodegen_agent_orchestrator::{AgentManager, InMemoryHistory, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::from_env().context("invalid settings")?;
    let binding = settings
        .provider_binding()
        .context("failed to configure provider")?;

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();
    let store = Arc::new(InMemoryHistory::new());
    let manager = AgentManager::new(store, settings.worker_config()).with_reply_callback(
        move |_agent, reply| {
            let _ = reply_tx.send(reply.to_string());
        },
    );

    let agent = manager
        .spawn(&settings.agent_name, binding)
        .context("failed to spawn agent")?;
    log::info!("{} ready as {agent}", settings.agent_name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut submitted = 0usize;
    let mut received = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if manager.submit(agent, &line) {
                        submitted += 1;
                    }
                }
                None => break,
            },
            Some(reply) = reply_rx.recv() => {
                received += 1;
                println!("{reply}");
            }
        }
    }

    while received < submitted {
        let Some(reply) = reply_rx.recv().await else {
            break;
        };
        received += 1;
        println!("{reply}");
    }

    let undelivered = manager.shutdown().await;
    for (agent, texts) in undelivered {
        log::warn!("{agent}: {} message(s) never processed", texts.len());
    }
    Ok(())
}

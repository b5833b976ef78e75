//! Integration tests for `AgentManager`

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use common::{
    EchoProvider, GatedProvider, NoConversationStore, PanicProvider, expect_replies, init_logging, texts, turns,
};
use kodegen_agent_orchestrator::{
    AgentId, AgentManager, AgentStatus, HistoryStore, InMemoryHistory, OrchestratorError, Provider,
    ProviderBinding, Role, StreamProcessConfig, WorkerConfig, WorkerState,
};

fn manager_with_replies() -> (
    AgentManager,
    Arc<InMemoryHistory>,
    mpsc::UnboundedReceiver<(AgentId, String)>,
) {
    let store = Arc::new(InMemoryHistory::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = AgentManager::new(store.clone(), WorkerConfig::default())
        .with_reply_callback(move |agent, reply| {
            let _ = tx.send((agent, reply.to_string()));
        });
    (manager, store, rx)
}

fn echo() -> ProviderBinding {
    let provider: Arc<dyn Provider> = Arc::new(EchoProvider::default());
    ProviderBinding::shared(provider)
}

#[tokio::test]
async fn test_unknown_agent_is_reported_not_raised() {
    init_logging();
    let (manager, _, _) = manager_with_replies();
    let ghost = AgentId::new(404);

    assert!(!manager.submit(ghost, "hello"));
    assert!(!manager.stop(ghost));
    assert_eq!(manager.is_alive(ghost), None);
    assert_eq!(manager.conversation(ghost), None);
}

#[tokio::test]
async fn test_same_name_agents_are_independent() {
    init_logging();
    let (manager, store, mut replies) = manager_with_replies();
    let a = manager.spawn("twin", echo()).unwrap();
    let b = manager.spawn("twin", echo()).unwrap();
    assert_ne!(a, b);

    assert!(manager.submit(a, "only for a"));
    assert!(manager.submit(b, "only for b"));
    let mut got = expect_replies(&mut replies, 2).await;
    got.sort();
    assert_eq!(
        got,
        vec![(a, "echo: only for a".to_string()), (b, "echo: only for b".to_string())]
    );

    let ca = manager.conversation(a).unwrap();
    let cb = manager.conversation(b).unwrap();
    assert_ne!(ca, cb);
    assert_eq!(texts(&turns(&store, ca), Role::User), vec!["only for a"]);
    assert_eq!(texts(&turns(&store, cb), Role::User), vec!["only for b"]);
}

#[tokio::test]
async fn test_list_and_stop() {
    init_logging();
    let (manager, store, _) = manager_with_replies();
    let a = manager.spawn("a", echo()).unwrap();
    let b = manager.spawn("b", echo()).unwrap();
    assert_eq!(manager.list().into_iter().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(manager.len(), 2);

    assert!(manager.stop(a));
    assert!(!manager.stop(a));
    assert!(!manager.submit(a, "gone"));

    assert_eq!(manager.list().into_iter().collect::<Vec<_>>(), vec![b]);
    assert_eq!(store.agent(a).unwrap().unwrap().status, AgentStatus::Stopped);
    assert_eq!(store.agent(b).unwrap().unwrap().status, AgentStatus::Running);
}

#[tokio::test]
async fn test_summaries_describe_registered_agents() {
    init_logging();
    let (manager, _, _) = manager_with_replies();
    let a = manager.spawn("alpha", echo()).unwrap();

    let summaries = manager.summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, a);
    assert_eq!(summaries[0].name, "alpha");
    assert_eq!(summaries[0].provider, "echo");
    assert!(summaries[0].alive);
    assert_ne!(summaries[0].state, WorkerState::Stopped);
    assert_eq!(manager.is_alive(a), Some(true));
}

#[tokio::test]
async fn test_spawn_surfaces_configuration_errors() {
    init_logging();
    let (manager, store, _) = manager_with_replies();

    let binding = ProviderBinding::stream_process(
        StreamProcessConfig::builder("definitely-not-a-real-binary-4242").build(),
    );
    let result = manager.spawn("broken", binding);

    assert!(matches!(result, Err(OrchestratorError::CliNotFound(_))));
    assert!(manager.is_empty());
    assert!(store.agents().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_returns_undelivered_mail() {
    init_logging();
    let (manager, _, mut replies) = manager_with_replies();
    let (gated, mut started) = GatedProvider::new();
    let provider: Arc<dyn Provider> = gated.clone();
    let a = manager.spawn("busy", ProviderBinding::shared(provider)).unwrap();
    let b = manager.spawn("idle", echo()).unwrap();

    assert!(manager.submit(a, "first"));
    assert!(manager.submit(a, "second"));
    expect_replies(&mut started, 1).await;

    let shutdown = tokio::spawn(async move { manager.shutdown().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    gated.gate.add_permits(1);

    let undelivered = tokio::time::timeout(Duration::from_secs(10), shutdown)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(undelivered.get(&a), Some(&vec!["second".to_string()]));
    assert!(!undelivered.contains_key(&b));
    assert_eq!(expect_replies(&mut replies, 1).await[0].1, "done: first");
}

#[tokio::test]
async fn test_dedicated_binding_runs_factory_per_agent() {
    init_logging();
    let (manager, _, mut replies) = manager_with_replies();
    let binding = || {
        ProviderBinding::dedicated(|| {
            let provider: Arc<dyn Provider> = Arc::new(EchoProvider::default());
            Ok(provider)
        })
    };
    let a = manager.spawn("a", binding()).unwrap();
    assert!(manager.submit(a, "hi"));
    assert_eq!(expect_replies(&mut replies, 1).await[0].1, "echo: hi");

    let failing = ProviderBinding::dedicated(|| Err(OrchestratorError::missing_credential("KEY")));
    assert!(matches!(
        manager.spawn("b", failing),
        Err(OrchestratorError::MissingCredential(_))
    ));
    assert_eq!(manager.len(), 1);
}

async fn wait_until_dead(manager: &AgentManager, agent: AgentId) {
    for _ in 0..200 {
        if manager.is_alive(agent) == Some(false) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{agent} never stopped running");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crashed_worker_only_affects_its_agent() {
    init_logging();
    let (manager, store, mut replies) = manager_with_replies();
    let provider: Arc<dyn Provider> = Arc::new(PanicProvider);
    let a = manager.spawn("fragile", ProviderBinding::shared(provider)).unwrap();
    let b = manager.spawn("steady", echo()).unwrap();

    assert!(manager.submit(a, "hi"));
    wait_until_dead(&manager, a).await;

    assert_eq!(manager.is_alive(a), Some(false));
    assert_eq!(manager.is_alive(b), Some(true));
    assert!(!manager.submit(a, "anyone there?"));

    // Still registered, but no longer listed as running
    assert_eq!(manager.list().into_iter().collect::<Vec<_>>(), vec![b]);
    assert_eq!(manager.len(), 1);
    let summaries = manager.summaries();
    assert_eq!(summaries.len(), 2);
    assert!(!summaries.iter().find(|s| s.id == a).unwrap().alive);

    let ca = manager.conversation(a).unwrap();
    let roles: Vec<Role> = turns(&store, ca).iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User]);

    assert!(manager.submit(b, "still here"));
    assert_eq!(
        expect_replies(&mut replies, 1).await,
        vec![(b, "echo: still here".to_string())]
    );

    assert!(manager.stop(a));
    assert_eq!(manager.is_alive(a), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_finished_workers_are_reaped_on_stop() {
    init_logging();
    let (manager, _, mut replies) = manager_with_replies();
    let (gated, mut started) = GatedProvider::new();
    let provider: Arc<dyn Provider> = gated.clone();
    let busy = manager.spawn("busy", ProviderBinding::shared(provider)).unwrap();

    assert!(manager.submit(busy, "first"));
    assert!(manager.submit(busy, "second"));
    expect_replies(&mut started, 1).await;
    assert!(manager.stop(busy));
    assert_eq!(manager.retired_count(), 1);

    gated.gate.add_permits(1);
    assert_eq!(expect_replies(&mut replies, 1).await[0].1, "done: first");

    // Spawn/stop churn must not pile up finished handles
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let churn = manager.spawn("churn", echo()).unwrap();
        assert!(manager.stop(churn));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    let churn = manager.spawn("churn", echo()).unwrap();
    assert!(manager.stop(churn));
    assert!(manager.retired_count() <= 1);

    // Leftover mail of reaped workers is still reported
    let undelivered = manager.shutdown().await;
    assert_eq!(undelivered.get(&busy), Some(&vec!["second".to_string()]));
    assert_eq!(manager.retired_count(), 0);
}

#[tokio::test]
async fn test_failed_conversation_marks_agent_stopped() {
    init_logging();
    let store = Arc::new(NoConversationStore::default());
    let manager = AgentManager::new(store.clone(), WorkerConfig::default());

    let result = manager.spawn("orphan", echo());
    assert!(matches!(result, Err(OrchestratorError::Storage(_))));
    assert!(manager.is_empty());

    let agents = store.inner.agents();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].status, AgentStatus::Stopped);
}

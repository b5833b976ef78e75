//! Unit tests for the in-memory history store

use kodegen_agent_orchestrator::{
    AgentId, AgentStatus, ConversationId, HistoryStore, InMemoryHistory, OrchestratorError, Role,
};

fn store_with_conversation() -> (InMemoryHistory, AgentId, ConversationId) {
    let store = InMemoryHistory::new();
    let agent = store.create_agent("alpha", "test").unwrap();
    let conversation = store.create_conversation(agent, "Session alpha").unwrap();
    (store, agent, conversation)
}

#[test]
fn test_turns_keep_append_order() {
    let (store, _, conversation) = store_with_conversation();
    store.append(conversation, Role::System, "started").unwrap();
    store.append(conversation, Role::User, "one").unwrap();
    store.append(conversation, Role::Assistant, "two").unwrap();

    let turns = store.recent(conversation, 10).unwrap();
    let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["started", "one", "two"]);

    let positions: Vec<u64> = turns.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(turns[2].role, Role::Assistant);
}

#[test]
fn test_recent_returns_newest_window_oldest_first() {
    let (store, _, conversation) = store_with_conversation();
    for i in 0..5 {
        store.append(conversation, Role::User, &format!("m{i}")).unwrap();
    }

    let turns = store.recent(conversation, 2).unwrap();
    let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["m3", "m4"]);

    assert!(store.recent(conversation, 0).unwrap().is_empty());
    assert_eq!(store.recent(conversation, 100).unwrap().len(), 5);
}

#[test]
fn test_conversations_are_separate() {
    let store = InMemoryHistory::new();
    let a = store.create_agent("same", "test").unwrap();
    let b = store.create_agent("same", "test").unwrap();
    assert_ne!(a, b);

    let ca = store.create_conversation(a, "a").unwrap();
    let cb = store.create_conversation(b, "b").unwrap();
    store.append(ca, Role::User, "for a").unwrap();

    assert_eq!(store.recent(ca, 10).unwrap().len(), 1);
    assert!(store.recent(cb, 10).unwrap().is_empty());
    assert_eq!(store.conversations_of(b), vec![(cb, "b".to_string())]);
}

#[test]
fn test_agent_status_updates() {
    let (store, agent, _) = store_with_conversation();
    assert_eq!(store.agent(agent).unwrap().unwrap().status, AgentStatus::Running);

    store.set_agent_status(agent, AgentStatus::Stopped).unwrap();
    let record = store.agent(agent).unwrap().unwrap();
    assert_eq!(record.status, AgentStatus::Stopped);
    assert_eq!(record.name, "alpha");
    assert_eq!(store.agents().len(), 1);
}

#[test]
fn test_unknown_ids_are_errors() {
    let store = InMemoryHistory::new();
    let ghost = AgentId::new(99);

    assert!(matches!(
        store.set_agent_status(ghost, AgentStatus::Stopped),
        Err(OrchestratorError::AgentNotFound(_))
    ));
    assert!(store.create_conversation(ghost, "x").is_err());
    assert!(store.append(ConversationId::new(7), Role::User, "x").is_err());
    assert!(store.recent(ConversationId::new(7), 1).is_err());
    assert!(store.agent(ghost).unwrap().is_none());
}

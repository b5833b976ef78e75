//! Integration tests for `StreamProcessProvider`
//!
//! Fake children are small `sh` scripts speaking the line-JSON protocol.

#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use kodegen_agent_orchestrator::{
    ChatMessage, OrchestratorError, Provider, ProviderPhase, ReadinessPolicy, RestartPolicy,
    StreamProcessConfig, StreamProcessConfigBuilder, StreamProcessProvider, is_sentinel,
};
use serde_json::Value;

const INIT: &str = r#"{"type":"system","subtype":"init"}"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config running `script` under `sh -c`; protocol flags land in `$1..`
fn fake_child(script: &str) -> StreamProcessConfigBuilder {
    StreamProcessConfig::builder("sh")
        .args(["-c", script, "fake-cli"])
        .response_timeout(Duration::from_secs(5))
        .gather_window(Duration::from_millis(200))
        .gather_idle(Duration::from_millis(100))
}

fn reply_script(reply_line: &str) -> String {
    format!(
        "printf '%s\\n' '{INIT}'\nwhile read -r line; do printf '%s\\n' '{reply_line}'; done"
    )
}

fn hi() -> Vec<ChatMessage> {
    vec![ChatMessage::user("Hi")]
}

fn launches(marker: &Path) -> usize {
    std::fs::read_to_string(marker)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_full_assistant_message() {
    init_logging();
    let script = reply_script(r#"{"type":"assistant","message":{"content":"Hallo"}}"#);
    let provider = StreamProcessProvider::new(fake_child(&script).build()).unwrap();
    assert_eq!(provider.phase(), ProviderPhase::NotStarted);

    let reply = provider.generate("", &hi()).await.unwrap();

    assert_eq!(reply, "Hallo");
    assert_eq!(provider.phase(), ProviderPhase::Ready);
    provider.shutdown().await;
    assert_eq!(provider.phase(), ProviderPhase::Exited);
}

#[tokio::test]
async fn test_deltas_are_concatenated() {
    init_logging();
    let script = r#"while read -r line; do
printf '%s\n' '{"type":"assistant_delta","delta":"He"}'
printf '%s\n' '{"type":"assistant_delta","delta":"llo"}'
printf '%s\n' '{"type":"assistant_delta","delta":"!"}'
done"#;
    let provider = StreamProcessProvider::new(fake_child(script).build()).unwrap();

    assert_eq!(provider.generate("", &hi()).await.unwrap(), "Hello!");
}

#[tokio::test]
async fn test_block_list_content() {
    init_logging();
    let script = reply_script(
        r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hal"},{"type":"text","text":"lo"}]}}"#,
    );
    let provider = StreamProcessProvider::new(fake_child(&script).build()).unwrap();

    assert_eq!(provider.generate("", &hi()).await.unwrap(), "Hallo");
}

#[tokio::test]
async fn test_outbound_lines_and_instructions_once() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stdin.jsonl");
    let script = r#"while read -r line; do
printf '%s\n' "$line" >> "$OUT_FILE"
printf '%s\n' '{"type":"assistant","content":"ok"}'
done"#;
    let config = fake_child(script)
        .env("OUT_FILE", out.to_string_lossy())
        .instructions("Be brief.")
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    let mut history = vec![ChatMessage::user("Hi")];
    assert_eq!(provider.generate("ignored", &history).await.unwrap(), "ok");
    history.push(ChatMessage::assistant("ok"));
    history.push(ChatMessage::user("Again"));
    assert_eq!(provider.generate("ignored", &history).await.unwrap(), "ok");

    let written = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<Value> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    for line in &lines {
        assert_eq!(line["type"], "user");
        assert_eq!(line["message"]["role"], "user");
        assert_eq!(line["session_id"], provider.session_id().as_str());
    }
    assert_eq!(lines[0]["message"]["content"], "Be brief.\n\n---\n\nHi");
    assert_eq!(lines[1]["message"]["content"], "Again");
}

#[test]
fn test_configured_session_id_is_used() {
    let script = reply_script(r#"{"type":"assistant","content":"ok"}"#);
    let config = fake_child(&script).session_id("fixed-session").build();
    let provider = StreamProcessProvider::new(config).unwrap();

    assert_eq!(provider.session_id().as_str(), "fixed-session");
}

#[tokio::test]
async fn test_silent_child_times_out() {
    init_logging();
    let config = fake_child("cat > /dev/null")
        .response_timeout(Duration::from_millis(300))
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    let reply = provider.generate("", &hi()).await.unwrap();

    assert!(is_sentinel(&reply), "{reply}");
    assert_eq!(reply, "[stream-process timeout after 0.3s]");
    assert_eq!(provider.phase(), ProviderPhase::Ready);
}

#[tokio::test]
async fn test_exit_code_is_reported() {
    init_logging();
    let provider = StreamProcessProvider::new(
        fake_child("exit 1").restart(RestartPolicy::Never).build(),
    )
    .unwrap();

    let reply = provider.generate("", &hi()).await.unwrap();

    assert!(is_sentinel(&reply), "{reply}");
    assert!(reply.contains("exited with code 1"), "{reply}");
    assert_eq!(provider.phase(), ProviderPhase::Exited);
}

#[tokio::test]
async fn test_exit_takes_priority_and_carries_stderr() {
    init_logging();
    let provider =
        StreamProcessProvider::new(fake_child("read -r line; echo 'bad token' >&2; exit 3").build())
            .unwrap();

    let reply = provider.generate("", &hi()).await.unwrap();

    assert!(reply.contains("exited with code 3"), "{reply}");
    assert!(reply.contains("bad token"), "{reply}");
}

#[tokio::test]
async fn test_stderr_replaces_bare_timeout() {
    init_logging();
    let config = fake_child("echo 'auth failed' >&2; cat > /dev/null")
        .response_timeout(Duration::from_millis(500))
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    let reply = provider.generate("", &hi()).await.unwrap();

    assert_eq!(reply, "[stream-process stderr] auth failed");
}

#[tokio::test]
async fn test_error_event_wakes_caller() {
    init_logging();
    let script = reply_script(r#"{"type":"error","error":"rate limited"}"#);
    let config = fake_child(&script)
        .response_timeout(Duration::from_secs(30))
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    let started = std::time::Instant::now();
    let reply = provider.generate("", &hi()).await.unwrap();

    assert_eq!(reply, "[stream-process error] rate limited");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    init_logging();
    let script = r#"while read -r line; do
printf '%s\n' 'garbage'
printf '%s\n' '{"type":'
printf '%s\n' '{"type":"assistant","content":"Hallo"}'
printf '%s\n' 'not json either'
done"#;
    let provider = StreamProcessProvider::new(fake_child(script).build()).unwrap();

    assert_eq!(provider.generate("", &hi()).await.unwrap(), "Hallo");
}

#[tokio::test]
async fn test_late_chunks_are_discarded() {
    init_logging();
    let script = r#"read -r line
printf '%s\n' '{"type":"assistant","content":"first"}'
sleep 0.4
printf '%s\n' '{"type":"assistant","content":"late"}'
read -r line
printf '%s\n' '{"type":"assistant","content":"second"}'
cat > /dev/null"#;
    let provider = StreamProcessProvider::new(fake_child(script).build()).unwrap();

    assert_eq!(provider.generate("", &hi()).await.unwrap(), "first");
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(provider.generate("", &hi()).await.unwrap(), "second");
}

#[tokio::test]
async fn test_dead_child_is_restarted_on_next_call() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("launches");
    let script = r#"echo launch >> "$MARKER"
read -r line
printf '%s\n' '{"type":"assistant","content":"once"}'
exit 0"#;
    let config = fake_child(script)
        .env("MARKER", marker.to_string_lossy())
        .restart(RestartPolicy::OnNextCall)
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    assert_eq!(provider.generate("", &hi()).await.unwrap(), "once");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(provider.generate("", &hi()).await.unwrap(), "once");

    assert_eq!(launches(&marker), 2);
    assert_eq!(provider.restarts().await, 1);
}

#[tokio::test]
async fn test_dead_child_stays_dead_without_restart() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("launches");
    let script = r#"echo launch >> "$MARKER"
read -r line
printf '%s\n' '{"type":"assistant","content":"once"}'
exit 0"#;
    let config = fake_child(script)
        .env("MARKER", marker.to_string_lossy())
        .restart(RestartPolicy::Never)
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    assert_eq!(provider.generate("", &hi()).await.unwrap(), "once");
    tokio::time::sleep(Duration::from_millis(200)).await;

    for _ in 0..2 {
        let reply = provider.generate("", &hi()).await.unwrap();
        assert!(reply.contains("exited with code 0"), "{reply}");
    }
    assert_eq!(launches(&marker), 1);
    assert_eq!(provider.restarts().await, 0);
    assert_eq!(provider.phase(), ProviderPhase::Exited);
}

#[tokio::test]
async fn test_missing_init_does_not_block() {
    init_logging();
    let script = r#"while read -r line; do printf '%s\n' '{"type":"assistant","content":"Hallo"}'; done"#;

    let advisory = StreamProcessProvider::new(fake_child(script).build()).unwrap();
    assert_eq!(advisory.generate("", &hi()).await.unwrap(), "Hallo");

    let awaiting = StreamProcessProvider::new(
        fake_child(script)
            .readiness(ReadinessPolicy::Await(Duration::from_millis(200)))
            .build(),
    )
    .unwrap();
    assert_eq!(awaiting.generate("", &hi()).await.unwrap(), "Hallo");
}

#[tokio::test]
async fn test_await_readiness_sees_late_init() {
    init_logging();
    let script = format!(
        r#"sleep 0.3
printf '%s\n' '{INIT}'
while read -r line; do printf '%s\n' '{{"type":"assistant","content":"ok"}}'; done"#
    );
    let config = fake_child(&script)
        .readiness(ReadinessPolicy::Await(Duration::from_secs(3)))
        .build();
    let provider = StreamProcessProvider::new(config).unwrap();

    let started = std::time::Instant::now();
    assert_eq!(provider.generate("", &hi()).await.unwrap(), "ok");
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(provider.phase(), ProviderPhase::Ready);
}

#[tokio::test]
async fn test_unlaunchable_program_yields_sentinel() {
    init_logging();
    // Exists but is not executable
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = StreamProcessConfig::builder(file.path()).build();
    let provider = StreamProcessProvider::new(config).unwrap();

    let reply = provider.generate("", &hi()).await.unwrap();

    assert!(reply.starts_with("[stream-process not running]"), "{reply}");
    assert_eq!(provider.phase(), ProviderPhase::Exited);
}

#[tokio::test]
async fn test_history_without_user_turn_is_an_error() {
    init_logging();
    let script = reply_script(r#"{"type":"assistant","content":"ok"}"#);
    let provider = StreamProcessProvider::new(fake_child(&script).build()).unwrap();

    let result = provider
        .generate("", &[ChatMessage::assistant("hello")])
        .await;

    assert!(matches!(result, Err(OrchestratorError::EmptyPrompt)));
    assert_eq!(provider.phase(), ProviderPhase::NotStarted);
}

#[test]
fn test_construction_checks() {
    let missing = StreamProcessProvider::new(
        StreamProcessConfig::builder("definitely-not-a-real-binary-4242").build(),
    );
    assert!(matches!(missing, Err(OrchestratorError::CliNotFound(_))));

    let bad_cwd = StreamProcessProvider::new(
        StreamProcessConfig::builder("sh")
            .cwd("/definitely/not/a/dir")
            .build(),
    );
    assert!(matches!(bad_cwd, Err(OrchestratorError::InvalidConfig(_))));
}

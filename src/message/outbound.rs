//! Encoding of user turns written to a streaming child process

use serde::Serialize;

use crate::error::Result;
use crate::types::identifiers::SessionId;

#[derive(Serialize)]
struct UserTurn<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: UserMessage<'a>,
    session_id: &'a SessionId,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Encode one user turn as a newline-terminated JSON line
///
/// Shape: `{"type":"user","message":{"role":"user","content":...},"session_id":...}`
///
/// # Errors
/// Returns `OrchestratorError::JsonDecode` if serialization fails
pub fn user_turn_line(content: &str, session_id: &SessionId) -> Result<String> {
    let turn = UserTurn {
        kind: "user",
        message: UserMessage {
            role: "user",
            content,
        },
        session_id,
    };
    let mut line = serde_json::to_string(&turn)?;
    line.push('\n');
    Ok(line)
}

/// Join standing instructions onto the first user turn
#[must_use]
pub fn with_instructions(instructions: &str, user_text: &str) -> String {
    format!("{instructions}\n\n---\n\n{user_text}")
}

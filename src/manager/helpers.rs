//! Pure helpers for building provider context

use crate::types::messages::{ChatMessage, Role, Turn};

/// Turn stored turns into provider history
///
/// Only user and assistant turns are kept; order is preserved.
pub(super) fn build_context(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .filter(|t| matches!(t.role, Role::User | Role::Assistant))
        .map(ChatMessage::from)
        .collect()
}

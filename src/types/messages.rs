//! Message-related type definitions
//!
//! Stored conversation turns, the context messages handed to providers, and
//! the content shapes a streaming child process may put on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::identifiers::{ConversationId, TurnId};

// ============================================================================
// Turns
// ============================================================================

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Inbound user text
    User,
    /// Provider reply (or an inline error text standing in for one)
    Assistant,
    /// Bookkeeping entries written by the orchestrator itself
    System,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Store-assigned identity
    pub id: TurnId,
    /// Conversation this turn belongs to
    pub conversation: ConversationId,
    /// Author
    pub role: Role,
    /// Turn text
    pub text: String,
    /// Zero-based position inside the conversation
    pub position: u64,
    /// Append time
    pub created_at: DateTime<Utc>,
}

/// Context message handed to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.text.clone(),
        }
    }
}

// ============================================================================
// Inbound Content
// ============================================================================

/// Content payload of an inbound assistant event
///
/// Children put text on the wire as a plain string, a single block or a list
/// of blocks. All three collapse into text through [`ContentValue::into_text`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    /// Plain string content
    Text(String),
    /// Ordered list of blocks
    Blocks(Vec<ContentPart>),
    /// Single structured block
    Block(ContentPart),
}

/// One element of a block list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    /// Bare string inside a list
    Text(String),
    /// Object block; only untyped or `"text"` blocks carry reply text
    Block {
        /// Block discriminator
        #[serde(rename = "type", default)]
        kind: Option<String>,
        /// Text payload
        #[serde(default)]
        text: Option<String>,
    },
}

impl ContentPart {
    /// Text carried by this part, empty for non-text blocks
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Block { kind, text } => match kind.as_deref() {
                None | Some("text") => text.unwrap_or_default(),
                Some(_) => String::new(),
            },
        }
    }
}

impl ContentValue {
    /// Collapse the content into text, concatenating block lists in order
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Block(part) => part.into_text(),
            Self::Blocks(parts) => parts.into_iter().map(ContentPart::into_text).collect(),
        }
    }
}

//! Chat data models shared by the proxy, the client session and the transcript.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        })
    }
}

/// A message in the client-side transcript.
///
/// `content` only changes for the assistant message that is currently
/// streaming; every other message is immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique per message (UUID v4).
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a message with a fresh id.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::with_id(new_message_id(), role, content)
    }

    pub fn with_id(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
        }
    }
}

/// Generate a unique message id.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The `{role, content}` pair sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of `POST /api/chat`.
///
/// A request built by the client always carries at least the newest user
/// message, hence `NonEmpty`. The proxy itself does not depend on this shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: NonEmpty<WireMessage>,
}

impl ChatRequest {
    /// Build a request from a message history, `None` if it is empty.
    pub fn from_history<'a>(history: impl IntoIterator<Item = &'a ChatMessage>) -> Option<Self> {
        let messages = history.into_iter().map(WireMessage::from).collect();
        NonEmpty::from_vec(messages).map(|messages| Self { messages })
    }
}

/// Error response shape: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

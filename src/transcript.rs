//! Chat transcript state machine.
//!
//! The transcript is an append-only message log. The only in-place mutation is
//! the growth of the assistant message that is currently streaming. All
//! changes go through [`Transcript::reduce`], a pure `(state, event) -> state`
//! function, so the state machine can be tested without any UI.

use itertools::Itertools;

use crate::model::{ChatMessage, ChatRequest, Role};

/// Content of the system message appended when a turn fails.
pub const FETCH_ERROR_NOTICE: &str = "Error: Failed to fetch response.";

/// Something that happened during a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The user submitted a message.
    UserSent { id: String, content: String },
    /// The response stream opened; an empty assistant message is appended.
    AssistantStarted { id: String },
    /// A text delta arrived for the streaming assistant message.
    AssistantDeltaReceived { delta: String },
    /// The response stream ended.
    AssistantFinalized,
    /// The turn failed, before or during streaming.
    ErrorOccurred { message: String },
}

/// Messages plus the flags driving the input control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    is_loading: bool,
    error: Option<String>,
    streaming: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True from `UserSent` until the turn is finalized or fails.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Error of the last failed turn, cleared by the next `UserSent`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The assistant message currently receiving deltas.
    pub fn streaming_message(&self) -> Option<&ChatMessage> {
        let id = self.streaming.as_deref()?;
        self.messages.iter().rev().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Whether a new message may be submitted.
    pub fn can_send(&self, input: &str) -> bool {
        !self.is_loading && !input.trim().is_empty()
    }

    /// The whole log as the request body for the next turn, `None` while
    /// empty.
    pub fn history(&self) -> Option<ChatRequest> {
        ChatRequest::from_history(&self.messages)
    }

    /// Apply one event.
    pub fn reduce(mut self, event: ChatEvent) -> Self {
        match event {
            ChatEvent::UserSent { id, content } => {
                if !self.can_send(&content) {
                    return self;
                }
                self.messages.push(ChatMessage::with_id(id, Role::User, content));
                self.is_loading = true;
                self.error = None;
            }
            ChatEvent::AssistantStarted { id } => {
                self.messages
                    .push(ChatMessage::with_id(id.clone(), Role::Assistant, ""));
                self.streaming = Some(id);
            }
            ChatEvent::AssistantDeltaReceived { delta } => {
                if let Some(id) = self.streaming.as_deref() {
                    if let Some(message) = self.messages.iter_mut().rev().find(|m| m.id == id) {
                        message.content.push_str(&delta);
                    }
                }
            }
            ChatEvent::AssistantFinalized => {
                self.streaming = None;
                self.is_loading = false;
            }
            ChatEvent::ErrorOccurred { message } => {
                self.streaming = None;
                self.is_loading = false;
                self.messages
                    .push(ChatMessage::new(Role::System, FETCH_ERROR_NOTICE));
                self.error = Some(message);
            }
        }
        self
    }

    /// In-place variant of [`Transcript::reduce`].
    pub fn apply(&mut self, event: ChatEvent) {
        *self = std::mem::take(self).reduce(event);
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .join("\n");
        f.write_str(&lines)
    }
}

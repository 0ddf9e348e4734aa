//! Conversation data model
//!
//! Messages are immutable once created and append-only within a session;
//! a reset replaces the whole list with the default greeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Greeting every fresh conversation starts with
pub const GREETING: &str = "Hello! How can I help you today?";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A citation attached to a bot reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextItem {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// A single conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the conversation
    pub id: Uuid,
    /// Message text
    pub text: String,
    /// Message author
    pub sender: Sender,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Citations attached to a bot reply
    #[serde(default)]
    pub context: Vec<ContextItem>,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            context: Vec::new(),
        }
    }

    /// Create a bot message with its citations
    pub fn bot(text: impl Into<String>, context: Vec<ContextItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
            context,
        }
    }

    /// The default greeting message
    pub fn greeting() -> Self {
        Self::bot(GREETING, Vec::new())
    }
}

/// In-memory conversation: ordered messages plus the typing flag
///
/// The typing flag is true only between a user send and the corresponding
/// bot reply's arrival (or failure).
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    typing: bool,
}

impl ConversationState {
    /// Create a conversation holding the default greeting
    pub fn new() -> Self {
        Self {
            messages: vec![Message::greeting()],
            typing: false,
        }
    }

    /// Messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether the bot is composing a reply
    pub fn typing(&self) -> bool {
        self.typing
    }

    /// Set the typing flag
    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the conversation with restored history
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.typing = false;
    }

    /// Drop everything back to the single greeting
    pub fn reset(&mut self) {
        self.messages = vec![Message::greeting()];
        self.typing = false;
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

//! Conversation Messages
//!
//! A single `Message{role, content}` value type used from the transport
//! boundary down to the model provider, and the `Conversation` that wraps
//! an ordered list of them.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// An ordered list of turns, the last of which is the question being asked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// A conversation consisting of a single user question.
    pub fn from_question(question: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(question)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Text of the most recent user message, if any.
    pub fn latest_question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }

    /// The turns preceding the latest user message, limited to the last `window`.
    ///
    /// System messages are not part of the history; contents are never truncated.
    pub fn history(&self, window: usize) -> Vec<Message> {
        let end = self
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::User)
            .unwrap_or(self.messages.len());
        let prior: Vec<&Message> = self.messages[..end]
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();
        let skip = prior.len().saturating_sub(window);
        prior.into_iter().skip(skip).cloned().collect()
    }

    /// Drop the oldest turns so at most `max_turns` remain.
    pub fn truncate_front(&mut self, max_turns: usize) {
        if self.messages.len() > max_turns {
            let excess = self.messages.len() - max_turns;
            self.messages.drain(..excess);
        }
    }
}

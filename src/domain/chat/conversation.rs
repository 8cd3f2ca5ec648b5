//! Conversation history entity

use super::message::{ChatMessage, Role};

/// Ordered message history for one model profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    /// Append a streamed fragment to the assistant reply in progress.
    ///
    /// Opens a new assistant message when the last message is not one.
    pub fn append_assistant_delta(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }

        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => last.content.push_str(delta),
            _ => self.messages.push(ChatMessage::assistant(delta)),
        }
    }

    /// Keep only the most recent `limit` messages. Zero means unlimited.
    pub fn truncate_to(&mut self, limit: usize) {
        if limit == 0 || self.messages.len() <= limit {
            return;
        }
        let excess = self.messages.len() - limit;
        self.messages.drain(..excess);
    }

    /// Drop every message after the first `len`
    pub fn rollback_to(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    /// Content of the most recent user message
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

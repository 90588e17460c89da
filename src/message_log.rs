//! Ordered record of exchanged turns

use crate::gateway::{HistoryEntry, HistoryRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

/// A single turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    /// Convert a history entry; entries without a timestamp are stamped `received_at`
    pub fn from_history(entry: HistoryEntry, received_at: DateTime<Utc>) -> Self {
        let role = match entry.role {
            HistoryRole::User => Role::User,
            HistoryRole::Agent => Role::Agent,
        };
        Self {
            role,
            content: entry.content,
            timestamp: entry.timestamp.unwrap_or(received_at),
        }
    }
}

/// Most recent agent message in `messages`
pub fn last_agent(messages: &[Message]) -> Option<&Message> {
    messages.iter().rev().find(|m| m.is_agent())
}

/// Append-only message log; replaced wholesale only on history load
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Most recent agent message, scanning from the end
    pub fn last_agent(&self) -> Option<&Message> {
        last_agent(&self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

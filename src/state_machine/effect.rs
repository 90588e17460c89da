//! Effects produced by state transitions

use crate::message_log::{Message, Role};
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the message log (stamped when executed)
    AppendMessage { role: Role, content: String },

    /// Replace the whole log (history load)
    ReplaceMessages { messages: Vec<Message> },

    /// Empty the log (logout, new session)
    ClearMessages,

    /// Revert a transient mode after `delay` unless `generation` has moved on
    ScheduleDecay { delay: Duration, generation: u64 },

    /// Drop any pending decay
    CancelDecay,
}

impl Effect {
    pub fn append_user(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn append_agent(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::Agent,
            content: content.into(),
        }
    }
}

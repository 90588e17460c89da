//! Session runtime
//!
//! Owns the session identity, executes state machine effects, and runs the
//! startup resumption sequence.

mod client;
mod error;
mod recovery;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use client::SessionClient;
pub use error::ClientError;
pub use recovery::{ResumeOutcome, ResumeReason, ResumeStep, ResumptionStepError};
pub use traits::*;

use crate::gateway::QuizInfo;
use crate::message_log::Message;
use crate::state_machine::Mode;
use serde::Serialize;

/// The one live session of this client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<String>,
}

/// Progress flag surfaced to the UI; not domain state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl OperationStatus {
    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn finish(&mut self, error: Option<String>) {
        self.loading = false;
        self.error = error;
    }
}

/// Point-in-time view of everything the UI renders
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
    pub user_id: Option<String>,
    pub mode: Mode,
    pub quiz_progress: Option<QuizInfo>,
    pub messages: Vec<Message>,
    pub status: OperationStatus,
}

/// Notifications for subscribed UIs
#[derive(Debug, Clone)]
pub enum ClientEvent {
    StateChange {
        mode: Mode,
        quiz_progress: Option<QuizInfo>,
    },
    Message {
        message: Message,
    },
    MessagesReplaced {
        count: usize,
    },
    Status {
        status: OperationStatus,
    },
    Error {
        message: String,
    },
}

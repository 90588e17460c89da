//! Errors surfaced by user-initiated operations

use super::StoreError;
use crate::gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to create session: {0}")]
    SessionCreate(#[source] GatewayError),
    #[error("Failed to send message: {0}")]
    MessageSend(#[source] GatewayError),
    #[error("Failed to submit answer: {0}")]
    AnswerSubmit(#[source] GatewayError),
    #[error("Failed to load history: {0}")]
    HistoryLoad(#[source] GatewayError),
    #[error("Quiz request failed: {0}")]
    QuizControl(#[source] GatewayError),
    #[error("Failed to delete session: {0}")]
    SessionDelete(#[source] GatewayError),
    #[error("Failed to load role cards: {0}")]
    RoleCardLoad(#[source] GatewayError),
    #[error("No active session")]
    NoSession,
    #[error("Another operation is in progress")]
    Busy,
    #[error("Identity store error: {0}")]
    Store(#[from] StoreError),
}

impl ClientError {
    /// The underlying gateway failure, if any
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            ClientError::SessionCreate(e)
            | ClientError::MessageSend(e)
            | ClientError::AnswerSubmit(e)
            | ClientError::HistoryLoad(e)
            | ClientError::QuizControl(e)
            | ClientError::SessionDelete(e)
            | ClientError::RoleCardLoad(e) => Some(e),
            ClientError::NoSession | ClientError::Busy | ClientError::Store(_) => None,
        }
    }

    /// Whether the service could not be reached at all
    pub fn is_gateway_unavailable(&self) -> bool {
        self.gateway_error()
            .is_some_and(|e| e.kind.is_unavailable())
    }
}

//! Remote agent service boundary
//!
//! The core only sees the [`Gateway`] trait; [`HttpGateway`] is the production
//! transport and [`LoggingGateway`] decorates any implementation with timing.

mod error;
mod http;
mod normalize;
mod types;

pub use error::{GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
pub use normalize::normalize_reply;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Operations offered by the remote agent service
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn create_session(&self, role_card_id: &str) -> Result<CreatedSession, GatewayError>;

    async fn send_message(&self, user_id: &str, text: &str) -> Result<AgentReply, GatewayError>;

    async fn submit_answer(&self, user_id: &str, answer: &str) -> Result<AgentReply, GatewayError>;

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError>;

    async fn get_quiz_progress(&self, user_id: &str) -> Result<QuizProgressReport, GatewayError>;

    async fn get_next_question(&self, user_id: &str) -> Result<AgentReply, GatewayError>;

    async fn start_quiz(&self, user_id: &str, total_questions: u32)
        -> Result<AgentReply, GatewayError>;

    async fn end_quiz(&self, user_id: &str) -> Result<AgentReply, GatewayError>;

    async fn delete_session(&self, user_id: &str) -> Result<DeleteAck, GatewayError>;

    async fn role_cards(&self) -> Result<Vec<RoleCard>, GatewayError>;
}

#[async_trait]
impl<T: Gateway + ?Sized> Gateway for Arc<T> {
    async fn create_session(&self, role_card_id: &str) -> Result<CreatedSession, GatewayError> {
        (**self).create_session(role_card_id).await
    }

    async fn send_message(&self, user_id: &str, text: &str) -> Result<AgentReply, GatewayError> {
        (**self).send_message(user_id, text).await
    }

    async fn submit_answer(&self, user_id: &str, answer: &str) -> Result<AgentReply, GatewayError> {
        (**self).submit_answer(user_id, answer).await
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        (**self).get_history(user_id, limit).await
    }

    async fn get_quiz_progress(&self, user_id: &str) -> Result<QuizProgressReport, GatewayError> {
        (**self).get_quiz_progress(user_id).await
    }

    async fn get_next_question(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        (**self).get_next_question(user_id).await
    }

    async fn start_quiz(
        &self,
        user_id: &str,
        total_questions: u32,
    ) -> Result<AgentReply, GatewayError> {
        (**self).start_quiz(user_id, total_questions).await
    }

    async fn end_quiz(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        (**self).end_quiz(user_id).await
    }

    async fn delete_session(&self, user_id: &str) -> Result<DeleteAck, GatewayError> {
        (**self).delete_session(user_id).await
    }

    async fn role_cards(&self) -> Result<Vec<RoleCard>, GatewayError> {
        (**self).role_cards().await
    }
}

/// Logging wrapper for gateways
pub struct LoggingGateway<G> {
    inner: G,
}

impl<G: Gateway> LoggingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    async fn timed<T, F>(&self, op: &'static str, call: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>> + Send,
        T: Send,
    {
        let start = Instant::now();
        let result = call.await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(op, duration_ms = %duration.as_millis(), "Gateway call completed");
            }
            Err(e) => {
                tracing::error!(
                    op,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Gateway call failed"
                );
            }
        }

        result
    }
}

#[async_trait]
impl<G: Gateway> Gateway for LoggingGateway<G> {
    async fn create_session(&self, role_card_id: &str) -> Result<CreatedSession, GatewayError> {
        self.timed("create_session", self.inner.create_session(role_card_id))
            .await
    }

    async fn send_message(&self, user_id: &str, text: &str) -> Result<AgentReply, GatewayError> {
        self.timed("send_message", self.inner.send_message(user_id, text))
            .await
    }

    async fn submit_answer(&self, user_id: &str, answer: &str) -> Result<AgentReply, GatewayError> {
        self.timed("submit_answer", self.inner.submit_answer(user_id, answer))
            .await
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.timed("get_history", self.inner.get_history(user_id, limit))
            .await
    }

    async fn get_quiz_progress(&self, user_id: &str) -> Result<QuizProgressReport, GatewayError> {
        self.timed("get_quiz_progress", self.inner.get_quiz_progress(user_id))
            .await
    }

    async fn get_next_question(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        self.timed("get_next_question", self.inner.get_next_question(user_id))
            .await
    }

    async fn start_quiz(
        &self,
        user_id: &str,
        total_questions: u32,
    ) -> Result<AgentReply, GatewayError> {
        self.timed("start_quiz", self.inner.start_quiz(user_id, total_questions))
            .await
    }

    async fn end_quiz(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        self.timed("end_quiz", self.inner.end_quiz(user_id)).await
    }

    async fn delete_session(&self, user_id: &str) -> Result<DeleteAck, GatewayError> {
        self.timed("delete_session", self.inner.delete_session(user_id))
            .await
    }

    async fn role_cards(&self) -> Result<Vec<RoleCard>, GatewayError> {
        self.timed("role_cards", self.inner.role_cards()).await
    }
}

//! HTTP transport for the agent service

use super::{
    normalize_reply, AgentReply, AnswerRequest, CreateSessionRequest, CreatedSession, DeleteAck,
    Gateway, GatewayError, HistoryEntry, QuizProgressReport, RoleCard, SendMessageRequest,
    StartQuizRequest,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Reqwest-backed gateway rooted at the service's `/api` prefix
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, &body));
        }
        Ok(response.json::<T>().await?)
    }

    /// Chat and quiz endpoints all answer with the agent reply shape
    async fn fetch_reply(&self, request: RequestBuilder) -> Result<AgentReply, GatewayError> {
        let raw: Value = self.fetch(request).await?;
        normalize_reply(raw)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn create_session(&self, role_card_id: &str) -> Result<CreatedSession, GatewayError> {
        let request = self
            .client
            .post(self.url("chat/create_session"))
            .json(&CreateSessionRequest { role_card_id });
        self.fetch(request).await
    }

    async fn send_message(&self, user_id: &str, text: &str) -> Result<AgentReply, GatewayError> {
        let request = self.client.post(self.url("chat/send")).json(&SendMessageRequest {
            user_id,
            message: text,
        });
        self.fetch_reply(request).await
    }

    async fn submit_answer(&self, user_id: &str, answer: &str) -> Result<AgentReply, GatewayError> {
        let request = self
            .client
            .post(self.url("quiz/answer"))
            .json(&AnswerRequest { user_id, answer });
        self.fetch_reply(request).await
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        let request = self
            .client
            .get(self.url(&format!("chat/history/{user_id}")))
            .query(&[("limit", limit)]);
        self.fetch(request).await
    }

    async fn get_quiz_progress(&self, user_id: &str) -> Result<QuizProgressReport, GatewayError> {
        let request = self.client.get(self.url(&format!("quiz/progress/{user_id}")));
        self.fetch(request).await
    }

    async fn get_next_question(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        let request = self.client.get(self.url(&format!("quiz/next/{user_id}")));
        self.fetch_reply(request).await
    }

    async fn start_quiz(
        &self,
        user_id: &str,
        total_questions: u32,
    ) -> Result<AgentReply, GatewayError> {
        let request = self.client.post(self.url("quiz/start")).json(&StartQuizRequest {
            user_id,
            total_questions,
        });
        self.fetch_reply(request).await
    }

    async fn end_quiz(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        let request = self.client.post(self.url(&format!("quiz/end/{user_id}")));
        self.fetch_reply(request).await
    }

    async fn delete_session(&self, user_id: &str) -> Result<DeleteAck, GatewayError> {
        let request = self.client.delete(self.url(&format!("chat/session/{user_id}")));
        self.fetch(request).await
    }

    async fn role_cards(&self) -> Result<Vec<RoleCard>, GatewayError> {
        let request = self.client.get(self.url("chat/role_cards"));
        let cards: BTreeMap<String, RoleCardEntry> = self.fetch(request).await?;
        Ok(flatten_role_cards(cards))
    }
}

/// Role cards arrive keyed by id
#[derive(Debug, Deserialize)]
struct RoleCardEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    description: String,
}

fn flatten_role_cards(cards: BTreeMap<String, RoleCardEntry>) -> Vec<RoleCard> {
    cards
        .into_iter()
        .map(|(id, entry)| RoleCard {
            id,
            name: entry.name,
            avatar: entry.avatar,
            description: entry.description,
        })
        .collect()
}

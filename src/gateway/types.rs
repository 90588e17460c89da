//! Request and response shapes of the remote agent service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mode the service reports the session to be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Quiz,
    /// Free-form chat; also absorbs any status the client does not know
    #[default]
    #[serde(other)]
    Chat,
}

/// Current question plus progress metadata, forwarded as received
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizInfo {
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Authoritative answer, present once the question has been graded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Echo of what the user submitted; its presence marks a graded payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Fields this client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuizInfo {
    /// Whether this payload carries a grading result
    pub fn is_graded(&self) -> bool {
        self.user_answer.is_some()
    }

    /// Whether the graded answer matched. `None` for ungraded payloads.
    pub fn is_correct(&self) -> Option<bool> {
        let user_answer = self.user_answer.as_deref()?;
        Some(self.answer.as_deref() == Some(user_answer))
    }
}

/// Normalized reply to a chat or quiz call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: ReplyStatus,
    #[serde(default)]
    pub quiz_info: Option<QuizInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl AgentReply {
    pub fn chat(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ReplyStatus::Chat,
            quiz_info: None,
            audio_url: None,
        }
    }

    pub fn quiz(message: impl Into<String>, quiz_info: Option<QuizInfo>) -> Self {
        Self {
            message: message.into(),
            status: ReplyStatus::Quiz,
            quiz_info,
            audio_url: None,
        }
    }
}

/// Request body for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub role_card_id: &'a str,
}

/// Response to session creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub user_id: String,
    #[serde(default)]
    pub greeting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_card: Option<Value>,
}

/// Request body for `/chat/send`
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub user_id: &'a str,
    pub message: &'a str,
}

/// Request body for `/quiz/answer`
#[derive(Debug, Serialize)]
pub struct AnswerRequest<'a> {
    pub user_id: &'a str,
    pub answer: &'a str,
}

/// Request body for `/quiz/start`
#[derive(Debug, Serialize)]
pub struct StartQuizRequest<'a> {
    pub user_id: &'a str,
    pub total_questions: u32,
}

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    User,
    #[serde(alias = "assistant")]
    Agent,
}

/// One entry of `/chat/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Quiz status as reported by `/quiz/progress`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    NotStarted,
    Completed,
}

/// Response of `/quiz/progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizProgressReport {
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QuizProgressReport {
    pub fn is_in_progress(&self) -> bool {
        self.status == ProgressStatus::InProgress
    }
}

/// Acknowledgement of a session deletion
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Role card summary from `/chat/role_cards`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleCard {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub description: String,
}

//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::gateway::{
    AgentReply, CreatedSession, DeleteAck, Gateway, GatewayError, HistoryEntry,
    QuizProgressReport, RoleCard,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type Queue<T> = Mutex<VecDeque<Result<T, GatewayError>>>;

fn pop<T>(queue: &Queue<T>, endpoint: &str) -> Result<T, GatewayError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| {
            Err(GatewayError::unavailable(format!(
                "No mock response queued for {endpoint}"
            )))
        })
}

// ============================================================================
// Mock Gateway
// ============================================================================

/// Gateway returning queued results per endpoint.
///
/// `send_message`, `submit_answer`, `start_quiz` and `end_quiz` share one
/// reply queue. Unqueued calls fail as unavailable.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockGateway {
    sessions: Queue<CreatedSession>,
    replies: Queue<AgentReply>,
    history: Queue<Vec<HistoryEntry>>,
    progress: Queue<QuizProgressReport>,
    next_questions: Queue<AgentReply>,
    deletes: Queue<DeleteAck>,
    role_cards: Mutex<Vec<RoleCard>>,
    /// Record of all calls made, as `endpoint:args`
    pub calls: Mutex<Vec<String>>,
    /// When set, reply-producing calls wait for a notification
    gate: Mutex<Option<Arc<Notify>>>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_session(&self, user_id: &str, greeting: &str) {
        self.sessions.lock().unwrap().push_back(Ok(CreatedSession {
            user_id: user_id.to_string(),
            greeting: greeting.to_string(),
            role_card: None,
        }));
    }

    pub fn queue_session_error(&self, error: GatewayError) {
        self.sessions.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_reply(&self, reply: AgentReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_reply_error(&self, error: GatewayError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_history(&self, result: Result<Vec<HistoryEntry>, GatewayError>) {
        self.history.lock().unwrap().push_back(result);
    }

    pub fn queue_progress(&self, result: Result<QuizProgressReport, GatewayError>) {
        self.progress.lock().unwrap().push_back(result);
    }

    pub fn queue_next_question(&self, result: Result<AgentReply, GatewayError>) {
        self.next_questions.lock().unwrap().push_back(result);
    }

    pub fn queue_delete(&self, result: Result<DeleteAck, GatewayError>) {
        self.deletes.lock().unwrap().push_back(result);
    }

    pub fn set_role_cards(&self, cards: Vec<RoleCard>) {
        *self.role_cards.lock().unwrap() = cards;
    }

    /// Hold reply-producing calls until the returned handle is notified
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn create_session(&self, role_card_id: &str) -> Result<CreatedSession, GatewayError> {
        self.record(format!("create_session:{role_card_id}"));
        pop(&self.sessions, "create_session")
    }

    async fn send_message(&self, user_id: &str, text: &str) -> Result<AgentReply, GatewayError> {
        self.record(format!("send_message:{user_id}:{text}"));
        self.wait_for_gate().await;
        pop(&self.replies, "send_message")
    }

    async fn submit_answer(&self, user_id: &str, answer: &str) -> Result<AgentReply, GatewayError> {
        self.record(format!("submit_answer:{user_id}:{answer}"));
        self.wait_for_gate().await;
        pop(&self.replies, "submit_answer")
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.record(format!("get_history:{user_id}:{limit}"));
        pop(&self.history, "get_history")
    }

    async fn get_quiz_progress(&self, user_id: &str) -> Result<QuizProgressReport, GatewayError> {
        self.record(format!("get_quiz_progress:{user_id}"));
        pop(&self.progress, "get_quiz_progress")
    }

    async fn get_next_question(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        self.record(format!("get_next_question:{user_id}"));
        pop(&self.next_questions, "get_next_question")
    }

    async fn start_quiz(
        &self,
        user_id: &str,
        total_questions: u32,
    ) -> Result<AgentReply, GatewayError> {
        self.record(format!("start_quiz:{user_id}:{total_questions}"));
        self.wait_for_gate().await;
        pop(&self.replies, "start_quiz")
    }

    async fn end_quiz(&self, user_id: &str) -> Result<AgentReply, GatewayError> {
        self.record(format!("end_quiz:{user_id}"));
        self.wait_for_gate().await;
        pop(&self.replies, "end_quiz")
    }

    async fn delete_session(&self, user_id: &str) -> Result<DeleteAck, GatewayError> {
        self.record(format!("delete_session:{user_id}"));
        pop(&self.deletes, "delete_session")
    }

    async fn role_cards(&self) -> Result<Vec<RoleCard>, GatewayError> {
        self.record("role_cards".to_string());
        Ok(self.role_cards.lock().unwrap().clone())
    }
}

// ============================================================================
// In-Memory Identity Store
// ============================================================================

#[derive(Default)]
#[allow(dead_code)]
pub struct InMemoryIdentityStore {
    user_id: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(user_id: &str) -> Self {
        Self {
            user_id: Mutex::new(Some(user_id.to_string())),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.user_id.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn save(&self, user_id: &str) -> Result<(), StoreError> {
        *self.user_id.lock().unwrap() = Some(user_id.to_string());
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.user_id.lock().unwrap().clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.user_id.lock().unwrap() = None;
        Ok(())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::gateway::{HistoryRole, ProgressStatus, QuizInfo};
    use crate::message_log::Role;
    use crate::runtime::{ClientError, ClientEvent, ResumeReason, SessionClient};
    use crate::state_machine::Mode;
    use std::time::Duration;

    type TestClient = SessionClient<Arc<MockGateway>, Arc<InMemoryIdentityStore>>;

    const DECAY: Duration = Duration::from_millis(30);

    fn test_client(gateway: &Arc<MockGateway>, store: &Arc<InMemoryIdentityStore>) -> TestClient {
        let config = ClientConfig {
            decay_delay: DECAY,
            ..ClientConfig::default()
        };
        SessionClient::new(Arc::clone(gateway), Arc::clone(store), &config)
    }

    /// Client with a live session and an empty log
    async fn session_client() -> (Arc<MockGateway>, Arc<InMemoryIdentityStore>, TestClient) {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let client = test_client(&gateway, &store);

        gateway.queue_session("user_1a2b3c4d", "呱！我是青蛙博士");
        client.create_session("evil_frog_doctor").await.unwrap();
        (gateway, store, client)
    }

    fn question(step: u32) -> QuizInfo {
        QuizInfo {
            step,
            total: 3,
            question_type: Some("choice".to_string()),
            question: Some(format!("Question {step}")),
            options: Some(vec!["A".to_string(), "B".to_string(), "C".to_string()]),
            ..QuizInfo::default()
        }
    }

    fn graded(step: u32, user_answer: &str, answer: &str) -> QuizInfo {
        QuizInfo {
            user_answer: Some(user_answer.to_string()),
            answer: Some(answer.to_string()),
            ..question(step)
        }
    }

    fn entry(role: HistoryRole, content: &str) -> HistoryEntry {
        HistoryEntry {
            role,
            content: content.to_string(),
            timestamp: None,
        }
    }

    fn in_progress() -> QuizProgressReport {
        QuizProgressReport {
            status: ProgressStatus::InProgress,
            progress: None,
            message: None,
        }
    }

    /// Put the client into quiz mode on question `step`
    async fn enter_quiz(gateway: &MockGateway, client: &TestClient, step: u32) {
        gateway.queue_reply(AgentReply::quiz("Let's begin", Some(question(step))));
        client.start_quiz(None).await.unwrap();
        assert_eq!(client.mode(), Mode::Quiz);
    }

    /// Let spawned timer tasks register their sleeps or react to a fired one
    async fn run_spawned_tasks() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    /// Move the paused clock forward and let due timers run
    async fn advance_clock(by: Duration) {
        run_spawned_tasks().await;
        tokio::time::advance(by).await;
        run_spawned_tasks().await;
    }

    async fn wait_until_loading(client: &TestClient) {
        for _ in 0..100 {
            if client.status().loading {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("operation never started");
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_session_persists_identity() {
        let (gateway, store, client) = session_client().await;

        assert_eq!(client.user_id().as_deref(), Some("user_1a2b3c4d"));
        assert_eq!(store.current().as_deref(), Some("user_1a2b3c4d"));
        assert_eq!(client.mode(), Mode::Idle);

        let messages = client.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Agent);
        assert_eq!(messages[0].content, "呱！我是青蛙博士");

        assert_eq!(gateway.recorded_calls(), vec!["create_session:evil_frog_doctor"]);
        assert_eq!(client.status(), crate::runtime::OperationStatus::default());
    }

    #[tokio::test]
    async fn test_create_session_failure_is_recorded() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let client = test_client(&gateway, &store);
        gateway.queue_session_error(GatewayError::unavailable("connection refused"));

        let err = client.create_session("evil_frog_doctor").await.unwrap_err();

        assert!(matches!(err, ClientError::SessionCreate(_)));
        assert!(err.is_gateway_unavailable());
        assert!(client.user_id().is_none());
        assert!(store.current().is_none());

        let status = client.status();
        assert!(!status.loading);
        assert_eq!(
            status.error.as_deref(),
            Some("Failed to create session: connection refused")
        );
    }

    #[tokio::test]
    async fn test_logout_then_restore_without_identity() {
        let (gateway, store, client) = session_client().await;
        enter_quiz(&gateway, &client, 1).await;

        client.logout().await.unwrap();
        assert!(store.current().is_none());

        let restored = client.restore_identity().await.unwrap();
        assert!(restored.is_none());
        assert!(client.user_id().is_none());
        assert_eq!(client.mode(), Mode::Idle);
        assert!(client.quiz_progress().is_none());
        assert!(client.messages().is_empty());
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let client = test_client(&gateway, &store);

        let err = client.send_message("hello").await.unwrap_err();
        assert!(matches!(err, ClientError::NoSession));
        assert!(client.messages().is_empty());
        assert!(gateway.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_session_logs_out() {
        let (gateway, store, client) = session_client().await;
        gateway.queue_delete(Ok(DeleteAck {
            status: "success".to_string(),
            message: "deleted".to_string(),
        }));

        client.delete_session().await.unwrap();

        assert!(client.user_id().is_none());
        assert!(store.current().is_none());
        assert!(client.messages().is_empty());
        assert!(gateway
            .recorded_calls()
            .contains(&"delete_session:user_1a2b3c4d".to_string()));
    }

    #[tokio::test]
    async fn test_delete_session_failure_keeps_session() {
        let (gateway, store, client) = session_client().await;
        gateway.queue_delete(Err(GatewayError::server("boom")));

        let err = client.delete_session().await.unwrap_err();

        assert!(matches!(err, ClientError::SessionDelete(_)));
        assert_eq!(client.user_id().as_deref(), Some("user_1a2b3c4d"));
        assert_eq!(store.current().as_deref(), Some("user_1a2b3c4d"));
        assert_eq!(client.messages().len(), 1);
        assert!(client.status().error.is_some());
    }

    #[tokio::test]
    async fn test_role_cards_passthrough() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let client = test_client(&gateway, &store);
        gateway.set_role_cards(vec![RoleCard {
            id: "evil_frog_doctor".to_string(),
            name: "青蛙博士".to_string(),
            ..RoleCard::default()
        }]);

        let cards = client.role_cards().await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "evil_frog_doctor");
        assert_eq!(client.mode(), Mode::Idle);
    }

    // ------------------------------------------------------------------------
    // Conversation
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_laughing_reply_is_happy() {
        let (gateway, _store, client) = session_client().await;
        // Skip the greeting
        let before = client.messages().len();

        gateway.queue_reply(AgentReply::chat("呱呱 hi"));
        client.send_message("hello").await.unwrap();

        assert_eq!(client.mode(), Mode::Happy);
        let messages = client.messages();
        assert_eq!(messages.len(), before + 2);
        let tail: Vec<_> = messages[before..]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(tail, vec![(Role::User, "hello"), (Role::Agent, "呱呱 hi")]);
        assert!(client.quiz_progress().is_none());
    }

    #[tokio::test]
    async fn test_surprised_and_plain_replies() {
        let (gateway, _store, client) = session_client().await;

        gateway.queue_reply(AgentReply::chat("真的吗？"));
        client.send_message("I like frogs").await.unwrap();
        assert_eq!(client.mode(), Mode::Surprised);

        gateway.queue_reply(AgentReply::chat("ok"));
        client.send_message("fine").await.unwrap();
        assert_eq!(client.mode(), Mode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_answer_decays_to_quiz() {
        let (gateway, _store, client) = session_client().await;
        enter_quiz(&gateway, &client, 1).await;

        gateway.queue_reply(AgentReply::quiz("wrong answer", Some(graded(2, "B", "A"))));
        client.submit_answer("B").await.unwrap();

        assert_eq!(client.mode(), Mode::Wrong);
        assert_eq!(client.quiz_progress().map(|q| q.step), Some(2));

        advance_clock(DECAY / 2).await;
        assert_eq!(client.mode(), Mode::Wrong);

        advance_clock(DECAY).await;
        assert_eq!(client.mode(), Mode::Quiz);
        assert_eq!(client.quiz_progress().map(|q| q.step), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_answer_supersedes_pending_decay() {
        let (gateway, _store, client) = session_client().await;
        enter_quiz(&gateway, &client, 1).await;

        gateway.queue_reply(AgentReply::quiz("correct", Some(graded(1, "A", "A"))));
        client.submit_answer("A").await.unwrap();
        assert_eq!(client.mode(), Mode::Correct);

        advance_clock(DECAY / 2).await;
        assert_eq!(client.mode(), Mode::Correct);

        // Answered again before the first decay fires
        gateway.queue_reply(AgentReply::quiz("wrong", Some(graded(2, "C", "B"))));
        client.submit_answer("C").await.unwrap();
        assert_eq!(client.mode(), Mode::Wrong);

        // Past the first window, inside the second
        advance_clock(DECAY * 3 / 4).await;
        assert_eq!(client.mode(), Mode::Wrong);

        advance_clock(DECAY / 2).await;
        assert_eq!(client.mode(), Mode::Quiz);
        assert_eq!(client.quiz_progress().map(|q| q.step), Some(2));
    }

    #[tokio::test]
    async fn test_quiz_end_clears_progress() {
        let (gateway, _store, client) = session_client().await;
        enter_quiz(&gateway, &client, 1).await;

        gateway.queue_reply(AgentReply::chat("Quiz over, 2/3 correct!"));
        client.end_quiz().await.unwrap();

        assert_eq!(client.mode(), Mode::Surprised);
        assert!(client.quiz_progress().is_none());
        assert!(gateway
            .recorded_calls()
            .contains(&"end_quiz:user_1a2b3c4d".to_string()));
    }

    #[tokio::test]
    async fn test_start_quiz_uses_configured_count() {
        let (gateway, _store, client) = session_client().await;
        gateway.queue_reply(AgentReply::quiz("go", Some(question(1))));
        client.start_quiz(None).await.unwrap();

        gateway.queue_reply(AgentReply::quiz("go", Some(question(1))));
        client.start_quiz(Some(5)).await.unwrap();

        let calls = gateway.recorded_calls();
        assert!(calls.contains(&"start_quiz:user_1a2b3c4d:3".to_string()));
        assert!(calls.contains(&"start_quiz:user_1a2b3c4d:5".to_string()));
    }

    #[tokio::test]
    async fn test_failure_resets_to_idle_and_records_error() {
        let (gateway, _store, client) = session_client().await;
        enter_quiz(&gateway, &client, 1).await;

        gateway.queue_reply_error(GatewayError::unavailable("connection reset"));
        let err = client.submit_answer("A").await.unwrap_err();

        assert!(matches!(err, ClientError::AnswerSubmit(_)));
        assert_eq!(client.mode(), Mode::Idle);
        assert!(client.quiz_progress().is_none());

        let status = client.status();
        assert!(!status.loading);
        assert_eq!(
            status.error.as_deref(),
            Some("Failed to submit answer: connection reset")
        );

        // The next operation clears the error
        gateway.queue_reply(AgentReply::chat("hi"));
        client.send_message("still there").await.unwrap();
        assert!(client.status().error.is_none());
    }

    #[tokio::test]
    async fn test_request_while_busy_is_rejected() {
        let (gateway, _store, client) = session_client().await;
        let gate = gateway.hold();
        gateway.queue_reply(AgentReply::chat("first"));

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.send_message("one").await }
        });
        wait_until_loading(&client).await;

        let before = client.messages().len();
        let err = client.send_message("two").await.unwrap_err();
        assert!(matches!(err, ClientError::Busy));
        assert_eq!(client.messages().len(), before);
        assert_eq!(client.mode(), Mode::Thinking);

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(client.mode(), Mode::Idle);
        assert!(!client.status().loading);
    }

    #[tokio::test]
    async fn test_reply_after_logout_is_dropped() {
        let (gateway, _store, client) = session_client().await;
        let gate = gateway.hold();
        gateway.queue_reply(AgentReply::quiz("late", Some(question(1))));

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.send_message("hello").await }
        });
        wait_until_loading(&client).await;

        client.logout().await.unwrap();
        gate.notify_one();
        pending.await.unwrap().unwrap();

        assert_eq!(client.mode(), Mode::Idle);
        assert!(client.quiz_progress().is_none());
        assert!(client.messages().is_empty());
        assert!(!client.status().loading);
    }

    #[tokio::test]
    async fn test_subscribers_see_mode_changes() {
        let (gateway, _store, client) = session_client().await;
        let mut events = client.subscribe();

        gateway.queue_reply(AgentReply::chat("哈哈"));
        client.send_message("joke").await.unwrap();

        let mut modes = vec![];
        while let Ok(event) = events.try_recv() {
            if let ClientEvent::StateChange { mode, .. } = event {
                modes.push(mode);
            }
        }
        assert_eq!(modes, vec![Mode::Thinking, Mode::Happy]);
    }

    // ------------------------------------------------------------------------
    // Resumption
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_start_without_identity_does_nothing() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let client = test_client(&gateway, &store);

        assert!(client.start().await.is_none());
        assert!(gateway.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_resume_with_empty_history_stays_idle() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::with_user_id("user_1a2b3c4d"));
        let client = test_client(&gateway, &store);
        gateway.queue_history(Ok(vec![]));

        let outcome = client.start().await.unwrap();

        assert_eq!(outcome.reason, ResumeReason::EmptyHistory);
        assert_eq!(outcome.mode, Mode::Idle);
        assert!(client.quiz_progress().is_none());
        assert_eq!(gateway.recorded_calls(), vec!["get_history:user_1a2b3c4d:50"]);
    }

    #[tokio::test]
    async fn test_resume_quiz_with_failing_question_fetch() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::with_user_id("user_1a2b3c4d"));
        let client = test_client(&gateway, &store);
        gateway.queue_history(Ok(vec![
            entry(HistoryRole::Agent, "你好"),
            entry(HistoryRole::User, "start quiz"),
            entry(HistoryRole::Agent, "Question 1"),
        ]));
        gateway.queue_progress(Ok(in_progress()));
        gateway.queue_next_question(Err(GatewayError::unavailable("timeout")));

        let outcome = client.start().await.unwrap();

        assert_eq!(outcome.reason, ResumeReason::QuestionUnavailable);
        assert_eq!(client.mode(), Mode::Quiz);
        assert!(client.quiz_progress().is_none());
        assert_eq!(client.messages().len(), 3);

        let status = client.status();
        assert!(!status.loading);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_resume_quiz_restores_question() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::with_user_id("user_1a2b3c4d"));
        let client = test_client(&gateway, &store);
        gateway.queue_history(Ok(vec![entry(HistoryRole::Agent, "Question 2")]));
        gateway.queue_progress(Ok(in_progress()));
        gateway.queue_next_question(Ok(AgentReply::quiz("Question 2", Some(question(2)))));

        let outcome = client.start().await.unwrap();

        assert_eq!(outcome.reason, ResumeReason::QuizResumed);
        assert_eq!(outcome.mode, Mode::Quiz);
        assert_eq!(client.quiz_progress().map(|q| q.step), Some(2));
        // The fetched question is not appended to the log
        assert_eq!(client.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_without_agent_message_skips_progress() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::with_user_id("user_1a2b3c4d"));
        let client = test_client(&gateway, &store);
        gateway.queue_history(Ok(vec![entry(HistoryRole::User, "hello?")]));

        let outcome = client.start().await.unwrap();

        assert_eq!(outcome.reason, ResumeReason::NoAgentMessage);
        assert_eq!(client.mode(), Mode::Idle);
        assert_eq!(gateway.recorded_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_finished_quiz_is_idle() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::with_user_id("user_1a2b3c4d"));
        let client = test_client(&gateway, &store);
        gateway.queue_history(Ok(vec![entry(HistoryRole::Agent, "Well done")]));
        gateway.queue_progress(Ok(QuizProgressReport {
            status: ProgressStatus::Completed,
            progress: None,
            message: None,
        }));

        let outcome = client.start().await.unwrap();

        assert_eq!(outcome.reason, ResumeReason::QuizNotInProgress);
        assert_eq!(client.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn test_resume_swallows_gateway_failures() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryIdentityStore::with_user_id("user_1a2b3c4d"));
        let client = test_client(&gateway, &store);
        gateway.queue_history(Err(GatewayError::unavailable("connection refused")));

        let outcome = client.start().await.unwrap();
        assert_eq!(outcome.reason, ResumeReason::HistoryUnavailable);
        assert_eq!(client.mode(), Mode::Idle);
        assert!(client.status().error.is_none());

        gateway.queue_history(Ok(vec![entry(HistoryRole::Agent, "hi")]));
        gateway.queue_progress(Err(GatewayError::server("boom")));
        let outcome = client.resume().await;
        assert_eq!(outcome.reason, ResumeReason::ProgressUnavailable);
        assert_eq!(client.mode(), Mode::Idle);
        assert!(client.status().error.is_none());
    }

    #[tokio::test]
    async fn test_resume_mid_quiz_without_usable_history_settles_idle() {
        let (gateway, _store, client) = session_client().await;

        enter_quiz(&gateway, &client, 1).await;
        gateway.queue_history(Err(GatewayError::unavailable("connection refused")));
        let outcome = client.resume().await;
        assert_eq!(outcome.reason, ResumeReason::HistoryUnavailable);
        assert_eq!(outcome.mode, Mode::Idle);
        assert!(client.quiz_progress().is_none());

        enter_quiz(&gateway, &client, 2).await;
        gateway.queue_history(Ok(vec![]));
        let outcome = client.resume().await;
        assert_eq!(outcome.reason, ResumeReason::EmptyHistory);
        assert_eq!(outcome.mode, Mode::Idle);
        assert!(client.quiz_progress().is_none());

        enter_quiz(&gateway, &client, 3).await;
        gateway.queue_history(Ok(vec![entry(HistoryRole::User, "still there?")]));
        let outcome = client.resume().await;
        assert_eq!(outcome.reason, ResumeReason::NoAgentMessage);
        assert_eq!(outcome.mode, Mode::Idle);
        assert!(client.quiz_progress().is_none());
    }

    #[tokio::test]
    async fn test_start_discards_corrupt_identity_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{garbage").unwrap();

        let gateway = Arc::new(MockGateway::new());
        let store = FileIdentityStore::new(&path);
        let client =
            SessionClient::new(Arc::clone(&gateway), store.clone(), &ClientConfig::default());

        assert!(client.start().await.is_none());
        assert!(client.user_id().is_none());
        assert_eq!(client.mode(), Mode::Idle);
        assert!(gateway.recorded_calls().is_empty());
        assert!(!path.exists());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_history_failure_is_surfaced() {
        let (gateway, _store, client) = session_client().await;
        enter_quiz(&gateway, &client, 1).await;
        gateway.queue_history(Err(GatewayError::server("boom")));

        let err = client.load_history().await.unwrap_err();

        assert!(matches!(err, ClientError::HistoryLoad(_)));
        assert_eq!(client.mode(), Mode::Idle);
        assert!(client.status().error.is_some());
    }

    #[tokio::test]
    async fn test_load_history_replaces_log() {
        let (gateway, _store, client) = session_client().await;
        gateway.queue_history(Ok(vec![
            entry(HistoryRole::User, "hello"),
            entry(HistoryRole::Agent, "呱呱 hi"),
        ]));
        gateway.queue_progress(Ok(QuizProgressReport {
            status: ProgressStatus::NotStarted,
            progress: None,
            message: None,
        }));

        let messages = client.load_history().await.unwrap();

        assert_eq!(messages.len(), 2);
        let contents: Vec<_> = client.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["hello", "呱呱 hi"]);
        assert_eq!(client.mode(), Mode::Idle);
        assert!(!client.status().loading);
    }
}

//! Session lifecycle manager
//!
//! Feeds request events into the state machine, calls the gateway, and feeds
//! the outcome back. Effects are executed under the core lock; the lock is
//! never held across an await.

use super::traits::IdentityStore;
use super::{ClientError, ClientEvent, ClientSnapshot, OperationStatus, ResumeOutcome, Session};
use crate::config::ClientConfig;
use crate::gateway::{Gateway, QuizInfo, RoleCard};
use crate::message_log::{Message, MessageLog};
use crate::state_machine::{
    transition, Effect, Event, Mode, SessionContext, SessionState, TransitionError,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything guarded by the core lock
#[derive(Debug, Default)]
pub(super) struct Core {
    pub(super) session: Session,
    pub(super) state: SessionState,
    pub(super) log: MessageLog,
    pub(super) status: OperationStatus,
    /// Bumped on create and logout; replies from an older epoch are dropped
    pub(super) epoch: u64,
    decay_cancel: Option<CancellationToken>,
}

struct Shared<G, S> {
    gateway: G,
    store: S,
    context: SessionContext,
    history_limit: usize,
    quiz_questions: u32,
    core: Mutex<Core>,
    events_tx: broadcast::Sender<ClientEvent>,
}

/// Handle to the single session of this client. Cheap to clone.
pub struct SessionClient<G, S>
where
    G: Gateway + 'static,
    S: IdentityStore + 'static,
{
    shared: Arc<Shared<G, S>>,
}

impl<G, S> Clone for SessionClient<G, S>
where
    G: Gateway + 'static,
    S: IdentityStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G, S> SessionClient<G, S>
where
    G: Gateway + 'static,
    S: IdentityStore + 'static,
{
    pub fn new(gateway: G, store: S, config: &ClientConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                gateway,
                store,
                context: SessionContext::new(config.decay_delay),
                history_limit: config.history_limit,
                quiz_questions: config.quiz_questions,
                core: Mutex::new(Core::default()),
                events_tx,
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a remote session and make it the current one
    pub async fn create_session(&self, role_card_id: &str) -> Result<String, ClientError> {
        let epoch = self.begin_create()?;

        let created = match self.shared.gateway.create_session(role_card_id).await {
            Ok(created) => created,
            Err(e) => return Err(self.fail(epoch, ClientError::SessionCreate(e))),
        };

        self.install_session(&created.user_id, created.greeting);
        tracing::info!(user_id = %created.user_id, role_card_id, "Session created");

        // The in-memory session is already usable
        if let Err(e) = self.shared.store.save(&created.user_id).await {
            tracing::warn!(error = %e, "Failed to persist user id");
        }

        Ok(created.user_id)
    }

    /// Forget the session locally and in the identity store
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.reset_local();
        self.shared.store.clear().await?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Load the persisted identifier without contacting the service
    pub async fn restore_identity(&self) -> Result<Option<String>, ClientError> {
        let user_id = self.shared.store.load().await?;
        self.lock().session.user_id.clone_from(&user_id);
        Ok(user_id)
    }

    /// Cold start: restore the identity, then resume when one was found.
    ///
    /// An unreadable identity is discarded so the user can create a new session.
    pub async fn start(&self) -> Option<ResumeOutcome> {
        let restored = match self.restore_identity().await {
            Ok(restored) => restored,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                if let Err(e) = self.shared.store.clear().await {
                    tracing::warn!(error = %e, "Failed to clear identity store");
                }
                None
            }
        };

        let Some(user_id) = restored else {
            tracing::info!("No persisted session");
            return None;
        };

        tracing::info!(%user_id, "Restored identity, resuming");
        Some(self.resume().await)
    }

    /// Delete the remote session, then log out
    pub async fn delete_session(&self) -> Result<(), ClientError> {
        let (user_id, epoch) = self.begin(None)?;

        match self.shared.gateway.delete_session(&user_id).await {
            Ok(ack) => {
                tracing::info!(%user_id, status = %ack.status, "Remote session deleted");
                self.logout().await
            }
            Err(e) => {
                let err = ClientError::SessionDelete(e);
                tracing::warn!(error = %err, "Operation failed");
                self.end(epoch, Some(err.to_string()));
                Err(err)
            }
        }
    }

    pub async fn role_cards(&self) -> Result<Vec<RoleCard>, ClientError> {
        self.shared
            .gateway
            .role_cards()
            .await
            .map_err(ClientError::RoleCardLoad)
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    pub async fn send_message(&self, text: &str) -> Result<(), ClientError> {
        let (user_id, epoch) = self.begin(Some(Event::UserMessage {
            text: text.to_string(),
        }))?;

        match self.shared.gateway.send_message(&user_id, text).await {
            Ok(reply) => {
                self.complete(epoch, Event::ChatReply { reply });
                Ok(())
            }
            Err(e) => Err(self.fail(epoch, ClientError::MessageSend(e))),
        }
    }

    pub async fn submit_answer(&self, answer: &str) -> Result<(), ClientError> {
        let (user_id, epoch) = self.begin(Some(Event::AnswerSubmitted {
            answer: answer.to_string(),
        }))?;

        match self.shared.gateway.submit_answer(&user_id, answer).await {
            Ok(reply) => {
                self.complete(epoch, Event::AnswerReply { reply });
                Ok(())
            }
            Err(e) => Err(self.fail(epoch, ClientError::AnswerSubmit(e))),
        }
    }

    /// Ask the service for a quiz; `None` uses the configured question count
    pub async fn start_quiz(&self, total_questions: Option<u32>) -> Result<(), ClientError> {
        let total = total_questions.unwrap_or(self.shared.quiz_questions);
        let (user_id, epoch) = self.begin(Some(Event::QuizRequested))?;

        match self.shared.gateway.start_quiz(&user_id, total).await {
            Ok(reply) => {
                self.complete(epoch, Event::ChatReply { reply });
                Ok(())
            }
            Err(e) => Err(self.fail(epoch, ClientError::QuizControl(e))),
        }
    }

    pub async fn end_quiz(&self) -> Result<(), ClientError> {
        let (user_id, epoch) = self.begin(Some(Event::QuizRequested))?;

        match self.shared.gateway.end_quiz(&user_id).await {
            Ok(reply) => {
                self.complete(epoch, Event::ChatReply { reply });
                Ok(())
            }
            Err(e) => Err(self.fail(epoch, ClientError::QuizControl(e))),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn mode(&self) -> Mode {
        self.lock().state.mode
    }

    pub fn quiz_progress(&self) -> Option<QuizInfo> {
        self.lock().state.quiz_progress().cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().log.as_slice().to_vec()
    }

    pub fn status(&self) -> OperationStatus {
        self.lock().status.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock().session.user_id.clone()
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        let core = self.lock();
        ClientSnapshot {
            user_id: core.session.user_id.clone(),
            mode: core.state.mode,
            quiz_progress: core.state.quiz_progress().cloned(),
            messages: core.log.as_slice().to_vec(),
            status: core.status.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events_tx.subscribe()
    }

    // ========================================================================
    // Internals shared with resumption
    // ========================================================================

    pub(super) fn gateway(&self) -> &G {
        &self.shared.gateway
    }

    pub(super) fn history_limit(&self) -> usize {
        self.shared.history_limit
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, Core> {
        self.shared
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an operation: reject while busy, require a session, apply the
    /// request event (if any) and raise the loading flag
    pub(super) fn begin(&self, event: Option<Event>) -> Result<(String, u64), ClientError> {
        let mut core = self.lock();
        if core.status.loading {
            return Err(ClientError::Busy);
        }
        let user_id = core.session.user_id.clone().ok_or(ClientError::NoSession)?;

        if let Some(event) = event {
            if let Err(e) = self.apply(&mut core, event) {
                tracing::debug!(error = %e, "Request rejected");
                return Err(ClientError::Busy);
            }
        }

        core.status.begin();
        self.emit_status(&core);
        Ok((user_id, core.epoch))
    }

    fn begin_create(&self) -> Result<u64, ClientError> {
        let mut core = self.lock();
        if core.status.loading {
            return Err(ClientError::Busy);
        }
        core.status.begin();
        self.emit_status(&core);
        Ok(core.epoch)
    }

    /// Feed a reply into the machine and clear the loading flag.
    /// Returns false when the reply belongs to a previous session.
    pub(super) fn complete(&self, epoch: u64, event: Event) -> bool {
        let mut core = self.lock();
        if core.epoch != epoch {
            tracing::info!(epoch, current = core.epoch, "Dropping reply from a previous session");
            return false;
        }

        if let Err(e) = self.apply(&mut core, event) {
            tracing::warn!(error = %e, "Reply rejected by state machine");
        }
        core.status.finish(None);
        self.emit_status(&core);
        true
    }

    /// Apply an event within the current epoch without touching the status
    pub(super) fn settle(&self, epoch: u64, event: Event) -> bool {
        let mut core = self.lock();
        if core.epoch != epoch {
            return false;
        }
        if let Err(e) = self.apply(&mut core, event) {
            tracing::warn!(error = %e, "Event rejected by state machine");
        }
        true
    }

    /// Clear the loading flag, recording `error` if given
    pub(super) fn end(&self, epoch: u64, error: Option<String>) {
        let mut core = self.lock();
        if core.epoch != epoch {
            return;
        }
        core.status.finish(error);
        self.emit_status(&core);
    }

    /// Record a failed request: back to idle, error surfaced
    pub(super) fn fail(&self, epoch: u64, err: ClientError) -> ClientError {
        tracing::warn!(error = %err, "Operation failed");

        let mut core = self.lock();
        if core.epoch == epoch {
            if let Err(e) = self.apply(&mut core, Event::RequestFailed) {
                tracing::warn!(error = %e, "Failure rejected by state machine");
            }
            core.status.finish(Some(err.to_string()));
            self.emit_status(&core);
            self.emit(ClientEvent::Error {
                message: err.to_string(),
            });
        }
        err
    }

    fn install_session(&self, user_id: &str, greeting: String) {
        let mut core = self.lock();
        core.epoch += 1;
        core.session.user_id = Some(user_id.to_string());
        if let Err(e) = self.apply(&mut core, Event::SessionCreated { greeting }) {
            tracing::warn!(error = %e, "Session creation rejected by state machine");
        }
        core.status.finish(None);
        self.emit_status(&core);
    }

    fn reset_local(&self) {
        let mut core = self.lock();
        core.epoch += 1;
        core.session = Session::default();
        if let Err(e) = self.apply(&mut core, Event::LoggedOut) {
            tracing::warn!(error = %e, "Logout rejected by state machine");
        }
        core.status = OperationStatus::default();
        self.emit_status(&core);
    }

    fn decay_elapsed(&self, generation: u64) {
        let mut core = self.lock();
        if let Err(e) = self.apply(&mut core, Event::DecayElapsed { generation }) {
            tracing::debug!(error = %e, "Decay ignored");
        }
    }

    // ========================================================================
    // Effect execution
    // ========================================================================

    fn apply(&self, core: &mut Core, event: Event) -> Result<(), TransitionError> {
        let result = transition(&core.state, &self.shared.context, event)?;

        let changed = result.new_state.mode != core.state.mode
            || result.new_state.quiz_progress() != core.state.quiz_progress();
        if changed {
            tracing::debug!(
                from = %core.state.mode,
                to = %result.new_state.mode,
                generation = result.new_state.generation,
                "Mode transition"
            );
        }
        core.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(core, effect);
        }

        if changed {
            self.emit(ClientEvent::StateChange {
                mode: core.state.mode,
                quiz_progress: core.state.quiz_progress().cloned(),
            });
        }
        Ok(())
    }

    fn execute_effect(&self, core: &mut Core, effect: Effect) {
        match effect {
            Effect::AppendMessage { role, content } => {
                let message = Message::new(role, content);
                core.log.append(message.clone());
                self.emit(ClientEvent::Message { message });
            }

            Effect::ReplaceMessages { messages } => {
                let count = messages.len();
                core.log.replace_all(messages);
                self.emit(ClientEvent::MessagesReplaced { count });
            }

            Effect::ClearMessages => {
                core.log.clear();
                self.emit(ClientEvent::MessagesReplaced { count: 0 });
            }

            Effect::ScheduleDecay { delay, generation } => {
                if let Some(previous) = core.decay_cancel.take() {
                    previous.cancel();
                }
                let token = CancellationToken::new();
                core.decay_cancel = Some(token.clone());

                let client = self.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = token.cancelled() => {
                            tracing::debug!(generation, "Decay cancelled");
                        }
                        () = tokio::time::sleep(delay) => {
                            client.decay_elapsed(generation);
                        }
                    }
                });
            }

            Effect::CancelDecay => {
                if let Some(token) = core.decay_cancel.take() {
                    token.cancel();
                }
            }
        }
    }

    fn emit_status(&self, core: &Core) {
        self.emit(ClientEvent::Status {
            status: core.status.clone(),
        });
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine
        let _ = self.shared.events_tx.send(event);
    }
}

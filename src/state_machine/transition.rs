//! Pure state transition function
//!
//! The server's `status` field decides between chat and quiz. Local text
//! heuristics only pick the expression shown while chatting.

use super::state::{Mode, QuizTracker, SessionContext, SessionState};
use super::{Effect, Event};
use crate::gateway::{AgentReply, QuizInfo, ReplyStatus};
use thiserror::Error;

/// Substrings that make a chat reply read as laughter
const LAUGH_MARKERS: [&str; 2] = ["哈哈", "呱呱"];

/// Characters that make a chat reply read as surprised
const SURPRISE_MARKERS: [char; 4] = ['?', '？', '!', '！'];

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A request is already in flight")]
    Busy,
    #[error("Reply arrived while {0}, no request was pending")]
    UnexpectedReply(Mode),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; message
/// timestamps and timers are left to the effects.
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state.mode, event) {
        // ============================================================
        // Requests
        // ============================================================
        (Mode::Thinking, event) if event.is_request() => Err(TransitionError::Busy),

        (_, Event::UserMessage { text: turn } | Event::AnswerSubmitted { answer: turn }) => {
            Ok(TransitionResult::new(state.advance(Mode::Thinking, state.quiz.clone()))
                .with_effect(Effect::append_user(turn)))
        }

        (_, Event::QuizRequested) => Ok(TransitionResult::new(
            state.advance(Mode::Thinking, state.quiz.clone()),
        )),

        // ============================================================
        // Replies
        // ============================================================
        (Mode::Thinking, Event::ChatReply { reply }) => Ok(chat_reply(state, reply)),

        (Mode::Thinking, Event::AnswerReply { reply }) => Ok(answer_reply(state, context, reply)),

        (mode, Event::ChatReply { .. } | Event::AnswerReply { .. }) => {
            Err(TransitionError::UnexpectedReply(mode))
        }

        // Failures and resumption without a running quiz both land in chat
        (_, Event::RequestFailed | Event::ResumedIdle) => Ok(TransitionResult::new(
            state.advance(Mode::Idle, untracked(state)),
        )),

        // ============================================================
        // Decay
        // ============================================================
        (mode, Event::DecayElapsed { generation })
            if mode.is_transient() && generation == state.generation =>
        {
            Ok(TransitionResult::new(
                state.advance(Mode::Quiz, state.quiz.clone()),
            ))
        }

        // Superseded by a newer transition
        (_, Event::DecayElapsed { .. }) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Lifecycle
        // ============================================================
        (_, Event::SessionCreated { greeting }) => Ok(TransitionResult::new(
            state.advance(Mode::Idle, untracked(state)),
        )
        .with_effects([
            Effect::CancelDecay,
            Effect::ClearMessages,
            Effect::append_agent(greeting),
        ])),

        (_, Event::LoggedOut) => Ok(TransitionResult::new(
            state.advance(Mode::Idle, untracked(state)),
        )
        .with_effects([Effect::CancelDecay, Effect::ClearMessages])),

        // ============================================================
        // History and resumption
        // ============================================================

        // Log-only: the mode and any pending decay are untouched
        (_, Event::HistoryLoaded { messages }) => {
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::ReplaceMessages { messages }))
        }

        (_, Event::QuizResumed) => Ok(TransitionResult::new(
            state.advance(Mode::Quiz, untracked(state)),
        )),

        (Mode::Quiz, Event::QuestionFetched { quiz_info: Some(info) }) => Ok(
            TransitionResult::new(state.advance(Mode::Quiz, tracked(state, info))),
        ),

        (Mode::Quiz, Event::QuestionFetched { quiz_info: None }) => {
            Ok(TransitionResult::new(state.clone()))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (mode, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {mode} with event {event:?}"
        ))),
    }
}

/// Reply to a chat message or a quiz start/end request
fn chat_reply(state: &SessionState, reply: AgentReply) -> TransitionResult {
    let new_state = match (reply.status, reply.quiz_info) {
        (ReplyStatus::Quiz, Some(info)) => state.advance(Mode::Quiz, tracked(state, info)),
        (ReplyStatus::Quiz, None) => state.advance(Mode::Quiz, untracked(state)),
        (ReplyStatus::Chat, _) => {
            state.advance(expressive_mode(&reply.message), untracked(state))
        }
    };

    TransitionResult::new(new_state).with_effect(Effect::append_agent(reply.message))
}

/// Reply to a submitted answer
fn answer_reply(
    state: &SessionState,
    context: &SessionContext,
    reply: AgentReply,
) -> TransitionResult {
    let append = Effect::append_agent(reply.message);

    if reply.status != ReplyStatus::Quiz {
        // Quiz finished
        return TransitionResult::new(state.advance(Mode::Idle, untracked(state)))
            .with_effect(append);
    }

    match reply.quiz_info {
        Some(info) if info.is_graded() => {
            let mode = graded_mode(&info);
            let next = state.advance(mode, tracked(state, info));
            let generation = next.generation;
            TransitionResult::new(next).with_effects([
                append,
                Effect::ScheduleDecay {
                    delay: context.decay_delay,
                    generation,
                },
            ])
        }
        Some(info) => {
            TransitionResult::new(state.advance(Mode::Quiz, tracked(state, info)))
                .with_effect(append)
        }
        None => TransitionResult::new(state.advance(Mode::Quiz, state.quiz.clone()))
            .with_effect(append),
    }
}

/// The tracker of `state` showing `info`
fn tracked(state: &SessionState, info: QuizInfo) -> QuizTracker {
    let mut quiz = state.quiz.clone();
    quiz.set(info);
    quiz
}

/// The tracker of `state` with its question dropped
fn untracked(state: &SessionState) -> QuizTracker {
    let mut quiz = state.quiz.clone();
    quiz.clear();
    quiz
}

fn graded_mode(info: &QuizInfo) -> Mode {
    if info.is_correct() == Some(true) {
        Mode::Correct
    } else {
        Mode::Wrong
    }
}

/// Expression for a chat reply: laughter first, then surprise, else idle
pub fn expressive_mode(text: &str) -> Mode {
    if LAUGH_MARKERS.iter().any(|m| text.contains(m)) {
        Mode::Happy
    } else if text.contains(SURPRISE_MARKERS) {
        Mode::Surprised
    } else {
        Mode::Idle
    }
}

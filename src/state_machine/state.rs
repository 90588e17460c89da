//! Session state types

use crate::gateway::QuizInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How long `correct`/`wrong` stay on screen before reverting to `quiz`
pub const DEFAULT_DECAY_DELAY: Duration = Duration::from_secs(2);

/// Display mode of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Chat, nothing pending
    #[default]
    Idle,
    /// A request is in flight
    Thinking,
    /// Answering questions
    Quiz,
    /// Chat reply with laughter
    Happy,
    /// Chat reply with a question or exclamation
    Surprised,
    /// Momentary, decays to `Quiz`
    Correct,
    /// Momentary, decays to `Quiz`
    Wrong,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Thinking => "thinking",
            Mode::Quiz => "quiz",
            Mode::Happy => "happy",
            Mode::Surprised => "surprised",
            Mode::Correct => "correct",
            Mode::Wrong => "wrong",
        }
    }

    /// Modes that revert on their own after the decay delay
    pub fn is_transient(self) -> bool {
        matches!(self, Mode::Correct | Mode::Wrong)
    }

    /// Modes in which quiz progress is visible
    pub fn holds_quiz(self) -> bool {
        matches!(self, Mode::Quiz | Mode::Correct | Mode::Wrong)
    }

    /// Chat-side modes, where quiz progress must be empty
    pub fn is_chat(self) -> bool {
        matches!(self, Mode::Idle | Mode::Happy | Mode::Surprised)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holder for the current question. Transition rules live in the state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuizTracker {
    current: Option<QuizInfo>,
}

impl QuizTracker {
    pub fn set(&mut self, info: QuizInfo) {
        self.current = Some(info);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&QuizInfo> {
        self.current.as_ref()
    }
}

impl From<Option<QuizInfo>> for QuizTracker {
    fn from(current: Option<QuizInfo>) -> Self {
        Self { current }
    }
}

/// Mode plus quiz progress, versioned by a generation counter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub mode: Mode,
    pub(crate) quiz: QuizTracker,
    /// Incremented by every transition that writes the mode
    pub generation: u64,
}

impl SessionState {
    /// Quiz progress as the UI may show it.
    ///
    /// While `Thinking` the tracker keeps the question that is being answered,
    /// but it is only exposed in quiz modes.
    pub fn quiz_progress(&self) -> Option<&QuizInfo> {
        self.quiz.current().filter(|_| self.mode.holds_quiz())
    }

    /// Next state with the given mode and tracker
    pub(crate) fn advance(&self, mode: Mode, quiz: QuizTracker) -> Self {
        Self {
            mode,
            quiz,
            generation: self.generation + 1,
        }
    }
}

/// Immutable configuration for the state machine
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub decay_delay: Duration,
}

impl SessionContext {
    pub fn new(decay_delay: Duration) -> Self {
        Self { decay_delay }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_DELAY)
    }
}

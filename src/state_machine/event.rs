//! Events that drive session transitions

use crate::gateway::{AgentReply, QuizInfo};
use crate::message_log::Message;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle
    SessionCreated {
        greeting: String,
    },
    LoggedOut,

    // User intents
    UserMessage {
        text: String,
    },
    AnswerSubmitted {
        answer: String,
    },
    /// Quiz start/end requested; no user turn is recorded
    QuizRequested,

    // Gateway outcomes
    ChatReply {
        reply: AgentReply,
    },
    AnswerReply {
        reply: AgentReply,
    },
    RequestFailed,

    // Timer
    DecayElapsed {
        generation: u64,
    },

    // History and resumption
    HistoryLoaded {
        messages: Vec<Message>,
    },
    QuizResumed,
    QuestionFetched {
        quiz_info: Option<QuizInfo>,
    },
    ResumedIdle,
}

impl Event {
    /// Events that start a gateway request
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Event::UserMessage { .. } | Event::AnswerSubmitted { .. } | Event::QuizRequested
        )
    }
}

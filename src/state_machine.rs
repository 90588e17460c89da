//! Session mode state machine
//!
//! Elm-style: a pure transition function returns the next state plus the
//! effects the runtime has to carry out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{Mode, QuizTracker, SessionContext, SessionState, DEFAULT_DECAY_DELAY};
pub use transition::{expressive_mode, transition, TransitionError, TransitionResult};

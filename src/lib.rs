//! Quizmate - session client for a role-play quiz agent
//!
//! Tracks which mode the conversation is in (chat, quiz, or one of the
//! expressive and transient sub-states), derives it from the agent service's
//! replies, and rebuilds it after a restart.

pub mod config;
pub mod gateway;
pub mod message_log;
pub mod runtime;
pub mod state_machine;

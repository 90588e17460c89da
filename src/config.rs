//! Client configuration

use crate::state_machine::DEFAULT_DECAY_DELAY;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_ROLE_CARD: &str = "evil_frog_doctor";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_QUIZ_QUESTIONS: u32 = 3;

/// Configuration for the session client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the agent service, including the `/api` prefix
    pub api_url: String,
    /// Role card requested when creating a session
    pub role_card: String,
    /// Page size for history fetches
    pub history_limit: usize,
    /// Number of questions asked for when starting a quiz
    pub quiz_questions: u32,
    /// How long `correct`/`wrong` are shown
    pub decay_delay: Duration,
    pub request_timeout: Duration,
    /// Where the user id survives restarts
    pub state_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            role_card: DEFAULT_ROLE_CARD.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            quiz_questions: DEFAULT_QUIZ_QUESTIONS,
            decay_delay: DEFAULT_DECAY_DELAY,
            request_timeout: Duration::from_secs(30),
            state_path: default_state_path(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("QUIZMATE_API_URL").unwrap_or(defaults.api_url),
            role_card: std::env::var("QUIZMATE_ROLE_CARD").unwrap_or(defaults.role_card),
            history_limit: parse_env("QUIZMATE_HISTORY_LIMIT").unwrap_or(defaults.history_limit),
            quiz_questions: parse_env("QUIZMATE_QUIZ_QUESTIONS").unwrap_or(defaults.quiz_questions),
            decay_delay: parse_env("QUIZMATE_DECAY_MS")
                .map_or(defaults.decay_delay, Duration::from_millis),
            request_timeout: parse_env("QUIZMATE_TIMEOUT_SECS")
                .map_or(defaults.request_timeout, Duration::from_secs),
            state_path: std::env::var("QUIZMATE_STATE_PATH")
                .map_or(defaults.state_path, PathBuf::from),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    if let Ok(value) = raw.trim().parse() {
        Some(value)
    } else {
        tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
        None
    }
}

fn default_state_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".quizmate").join("session.json")
}

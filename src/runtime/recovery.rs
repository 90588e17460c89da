//! Session resumption
//!
//! Rebuilds the message log, mode and quiz progress after a reload. Every
//! step is best-effort: gateway failures are logged with the step that
//! failed and the sequence settles on a safe mode instead of erroring.

use super::traits::IdentityStore;
use super::{ClientError, SessionClient};
use crate::gateway::{Gateway, GatewayError};
use crate::message_log::{self, Message};
use crate::state_machine::{Event, Mode};
use chrono::Utc;
use std::fmt;
use thiserror::Error;

/// Remote call made during resumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStep {
    History,
    Progress,
    NextQuestion,
}

impl fmt::Display for ResumeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResumeStep::History => "history",
            ResumeStep::Progress => "progress",
            ResumeStep::NextQuestion => "next_question",
        })
    }
}

/// A swallowed resumption failure. Logged, never returned to callers.
#[derive(Debug, Error)]
#[error("Resumption step {step} failed: {source}")]
pub struct ResumptionStepError {
    pub step: ResumeStep,
    #[source]
    pub source: GatewayError,
}

impl ResumptionStepError {
    fn log(step: ResumeStep, source: GatewayError) {
        let err = Self { step, source };
        tracing::warn!(step = %err.step, kind = ?err.source.kind, error = %err, "Resumption step failed");
    }
}

/// Why resumption stopped where it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    /// No session, or another operation was running
    Skipped,
    HistoryUnavailable,
    EmptyHistory,
    NoAgentMessage,
    ProgressUnavailable,
    QuizNotInProgress,
    /// Quiz restored with its current question
    QuizResumed,
    /// Quiz restored but the service had no question to show
    NoQuestion,
    /// Quiz restored but fetching the question failed
    QuestionUnavailable,
}

/// Result of a resumption run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeOutcome {
    pub mode: Mode,
    pub reason: ResumeReason,
}

/// What the restored log says about the next step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDecision {
    /// Nothing to ask the service about
    Stop(ResumeReason),
    /// An agent turn exists, ask the service about the quiz
    CheckProgress,
}

/// Decide whether the quiz status needs checking.
///
/// Only a conversation the agent has taken part in can have a quiz running.
pub fn inspect_history(messages: &[Message]) -> HistoryDecision {
    if messages.is_empty() {
        return HistoryDecision::Stop(ResumeReason::EmptyHistory);
    }

    let Some(last_agent) = message_log::last_agent(messages) else {
        return HistoryDecision::Stop(ResumeReason::NoAgentMessage);
    };

    tracing::debug!(
        preview = %last_agent.content.chars().take(50).collect::<String>(),
        "Last agent message"
    );
    HistoryDecision::CheckProgress
}

impl<G, S> SessionClient<G, S>
where
    G: Gateway + 'static,
    S: IdentityStore + 'static,
{
    /// Reconstruct state for the current session. Never fails.
    pub async fn resume(&self) -> ResumeOutcome {
        let (user_id, epoch) = match self.begin(None) {
            Ok(started) => started,
            Err(e) => {
                tracing::info!(error = %e, "Resumption skipped");
                return ResumeOutcome {
                    mode: self.mode(),
                    reason: ResumeReason::Skipped,
                };
            }
        };

        let reason = match self.fetch_history(&user_id, epoch).await {
            Ok(messages) => self.reconcile_mode(&user_id, epoch, &messages).await,
            Err(source) => {
                ResumptionStepError::log(ResumeStep::History, source);
                ResumeReason::HistoryUnavailable
            }
        };

        // No quiz can be recovered, so a stale one from before must not linger
        if matches!(
            reason,
            ResumeReason::HistoryUnavailable
                | ResumeReason::EmptyHistory
                | ResumeReason::NoAgentMessage
        ) {
            self.settle(epoch, Event::ResumedIdle);
        }

        // Resumption never surfaces an error to the user
        self.end(epoch, None);

        let outcome = ResumeOutcome {
            mode: self.mode(),
            reason,
        };
        tracing::info!(mode = %outcome.mode, reason = ?outcome.reason, "Resumption finished");
        outcome
    }

    /// User-initiated history reload. A failed fetch is an error; the mode
    /// reconciliation that follows a successful one is best-effort. Unlike
    /// [`Self::resume`], a history with no agent turn leaves the mode alone.
    pub async fn load_history(&self) -> Result<Vec<Message>, ClientError> {
        let (user_id, epoch) = self.begin(None)?;

        let messages = match self.fetch_history(&user_id, epoch).await {
            Ok(messages) => messages,
            Err(e) => return Err(self.fail(epoch, ClientError::HistoryLoad(e))),
        };

        let reason = self.reconcile_mode(&user_id, epoch, &messages).await;
        tracing::info!(count = messages.len(), ?reason, "History loaded");

        self.end(epoch, None);
        Ok(messages)
    }

    async fn fetch_history(&self, user_id: &str, epoch: u64) -> Result<Vec<Message>, GatewayError> {
        let entries = self
            .gateway()
            .get_history(user_id, self.history_limit())
            .await?;

        let received_at = Utc::now();
        let messages: Vec<Message> = entries
            .into_iter()
            .map(|entry| Message::from_history(entry, received_at))
            .collect();

        self.settle(
            epoch,
            Event::HistoryLoaded {
                messages: messages.clone(),
            },
        );
        Ok(messages)
    }

    async fn reconcile_mode(&self, user_id: &str, epoch: u64, messages: &[Message]) -> ResumeReason {
        if let HistoryDecision::Stop(reason) = inspect_history(messages) {
            return reason;
        }

        let progress = match self.gateway().get_quiz_progress(user_id).await {
            Ok(progress) => progress,
            Err(source) => {
                ResumptionStepError::log(ResumeStep::Progress, source);
                self.settle(epoch, Event::ResumedIdle);
                return ResumeReason::ProgressUnavailable;
            }
        };

        if !progress.is_in_progress() {
            tracing::debug!(status = ?progress.status, "No quiz running");
            self.settle(epoch, Event::ResumedIdle);
            return ResumeReason::QuizNotInProgress;
        }

        self.settle(epoch, Event::QuizResumed);

        match self.gateway().get_next_question(user_id).await {
            Ok(reply) => {
                let reason = if reply.quiz_info.is_some() {
                    ResumeReason::QuizResumed
                } else {
                    ResumeReason::NoQuestion
                };
                self.settle(
                    epoch,
                    Event::QuestionFetched {
                        quiz_info: reply.quiz_info,
                    },
                );
                reason
            }
            Err(source) => {
                // Stay in quiz mode with no question rather than dropping the quiz
                ResumptionStepError::log(ResumeStep::NextQuestion, source);
                ResumeReason::QuestionUnavailable
            }
        }
    }
}

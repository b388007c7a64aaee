use std::sync::Arc;

use quiz_core::model::{AttemptId, Question, QuizSettings, UserId};
use storage::repository::QuestionRepository;

use super::service::{
    AdvanceOutcome, AdvanceTicket, AnswerOutcome, BeginOutcome, QuizSession, SessionGeneration,
};
use crate::attempts::{AttemptLedger, AttemptListItem};
use crate::error::SessionError;
use crate::identity::IdentityProvider;
use crate::question_source::QuestionSource;

/// Orchestrates loading, answering and recording for a single-owner session.
#[derive(Clone)]
pub struct QuizLoopService {
    settings: QuizSettings,
    identity: Arc<dyn IdentityProvider>,
    source: QuestionSource,
    ledger: AttemptLedger,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        settings: QuizSettings,
        identity: Arc<dyn IdentityProvider>,
        questions: Arc<dyn QuestionRepository>,
        ledger: AttemptLedger,
    ) -> Self {
        let source = QuestionSource::new(questions, settings.question_limit());
        Self {
            settings,
            identity,
            source,
            ledger,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.identity.current_user_id()
    }

    /// Discard the session and check that someone is signed in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without an identity; the session is still reset.
    pub fn prepare_restart(
        &self,
        session: &mut QuizSession,
    ) -> Result<(SessionGeneration, UserId), SessionError> {
        let generation = session.reset();
        let user_id = self.current_user().ok_or(SessionError::NotSignedIn)?;
        tracing::debug!(generation = generation.value(), %user_id, "quiz session reset");
        Ok((generation, user_id))
    }

    /// Fetch a freshly shuffled question set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SourceUnavailable` or `SessionError::Empty`.
    pub async fn load_questions(&self) -> Result<Vec<Question>, SessionError> {
        self.source.fetch_questions().await
    }

    /// Reset the session and load a new playthrough.
    ///
    /// On any error the session is left in `Loading`; calling `restart` again is the retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn`, `SessionError::SourceUnavailable` or
    /// `SessionError::Empty`.
    pub async fn restart(&self, session: &mut QuizSession) -> Result<BeginOutcome, SessionError> {
        let (generation, user_id) = self.prepare_restart(session)?;
        let questions = self.load_questions().await?;
        session.begin(generation, user_id, questions)
    }

    pub fn answer(&self, session: &mut QuizSession, option: usize) -> AnswerOutcome {
        let outcome = session.answer(option);
        match outcome {
            AnswerOutcome::Accepted { correct, .. } => {
                tracing::debug!(question = session.pointer(), option, correct, "answer accepted");
            }
            AnswerOutcome::Ignored(reason) => {
                tracing::debug!(?reason, option, "answer ignored");
            }
        }
        outcome
    }

    /// Apply a reveal ticket and, on completion, record the attempt.
    ///
    /// A failed write leaves the session `Complete`; use `finalize_attempt` to retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` if the attempt cannot be written.
    pub async fn advance(
        &self,
        session: &mut QuizSession,
        ticket: AdvanceTicket,
    ) -> Result<AdvanceOutcome, SessionError> {
        let outcome = session.advance(ticket);
        if outcome == AdvanceOutcome::Stale {
            tracing::debug!(
                ticket_generation = ticket.generation().value(),
                current_generation = session.generation().value(),
                "stale reveal ticket ignored"
            );
        }
        if matches!(outcome, AdvanceOutcome::Completed(_)) {
            self.finalize_attempt(session).await?;
        }
        Ok(outcome)
    }

    /// Record the finished attempt unless it is already saved.
    ///
    /// Never writes more than one record per playthrough.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if there is nothing to record, or
    /// `SessionError::Persistence` if the write fails.
    pub async fn finalize_attempt(
        &self,
        session: &mut QuizSession,
    ) -> Result<AttemptId, SessionError> {
        if let Some(id) = session.attempt_id() {
            return Ok(id);
        }
        let claim = session.claim_attempt().ok_or(SessionError::NotComplete)?;

        match self
            .ledger
            .record_attempt(claim.user_id, claim.score, claim.total)
            .await
        {
            Ok(id) => {
                session.mark_attempt_saved(claim.generation, id);
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save quiz attempt");
                session.mark_attempt_failed(claim.generation);
                Err(e)
            }
        }
    }

    /// Recent attempts of the signed-in player, for the progress panel.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` or `SessionError::Persistence`.
    pub async fn history(&self) -> Result<Vec<AttemptListItem>, SessionError> {
        let user_id = self.current_user().ok_or(SessionError::NotSignedIn)?;
        self.ledger
            .recent_attempts(user_id, self.settings.history_limit())
            .await
    }
}

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use quiz_core::model::AttemptId;

use super::service::{
    AdvanceOutcome, AdvanceTicket, AnswerOutcome, BeginOutcome, CompletedAttempt, QuizSession,
};
use super::view::{SessionNotice, SessionSnapshot};
use super::workflow::QuizLoopService;
use crate::attempts::AttemptListItem;
use crate::error::SessionError;

struct DriverState {
    session: QuizSession,
    history: Vec<AttemptListItem>,
    // Refreshes are numbered when issued; a read older than the applied one is dropped.
    history_issued: u64,
    history_applied: u64,
    notice: Option<SessionNotice>,
    pending_reveal: Option<JoinHandle<()>>,
}

impl DriverState {
    fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = self.session.snapshot();
        snapshot.history.clone_from(&self.history);
        snapshot.notice = self.notice;
        snapshot
    }

    fn cancel_reveal(&mut self) {
        if let Some(handle) = self.pending_reveal.take() {
            handle.abort();
        }
    }
}

/// Runs a quiz session on the tokio runtime and publishes every transition.
///
/// The reveal dwell runs on a spawned timer keyed by an `AdvanceTicket`, so a
/// restart during the dwell can never advance the new playthrough. Attempt writes
/// run on their own task after `Complete` has been published.
#[derive(Clone)]
pub struct QuizDriver {
    service: Arc<QuizLoopService>,
    state: Arc<Mutex<DriverState>>,
    updates: watch::Sender<SessionSnapshot>,
}

impl QuizDriver {
    #[must_use]
    pub fn new(service: QuizLoopService) -> Self {
        let session = QuizSession::new();
        let (updates, _) = watch::channel(session.snapshot());
        Self {
            service: Arc::new(service),
            state: Arc::new(Mutex::new(DriverState {
                session,
                history: Vec::new(),
                history_issued: 0,
                history_applied: 0,
                notice: None,
                pending_reveal: None,
            })),
            updates,
        }
    }

    #[must_use]
    pub fn service(&self) -> &QuizLoopService {
        &self.service
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    fn publish(&self, state: &DriverState) {
        self.updates.send_replace(state.snapshot());
    }

    /// Discard the current playthrough and load a new one.
    ///
    /// The fetch runs without holding the session lock; if another restart
    /// happens meanwhile, this one resolves as `BeginOutcome::Stale`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn`, `SessionError::SourceUnavailable` or
    /// `SessionError::Empty`. The session stays `Loading` in every case.
    pub async fn restart(&self) -> Result<BeginOutcome, SessionError> {
        let (generation, user_id) = {
            let mut state = self.state.lock().await;
            state.cancel_reveal();
            let prepared = self.service.prepare_restart(&mut state.session);
            state.notice = match &prepared {
                Ok(_) => None,
                Err(_) => Some(SessionNotice::NotSignedIn),
            };
            if prepared.is_err() {
                state.history.clear();
            }
            self.publish(&state);
            prepared?
        };

        let fetched = self.service.load_questions().await;

        let outcome = {
            let mut state = self.state.lock().await;
            if state.session.generation() != generation {
                tracing::debug!(generation = generation.value(), "dropping superseded question fetch");
                return Ok(BeginOutcome::Stale);
            }
            let questions = match fetched {
                Ok(questions) => questions,
                Err(e) => {
                    state.notice = Some(match e {
                        SessionError::Empty => SessionNotice::EmptyQuestionSet,
                        _ => SessionNotice::SourceUnavailable,
                    });
                    self.publish(&state);
                    return Err(e);
                }
            };
            let outcome = state.session.begin(generation, user_id, questions)?;
            self.publish(&state);
            outcome
        };

        if outcome == BeginOutcome::Started {
            self.refresh_history().await;
        }
        Ok(outcome)
    }

    /// Submit an option for the current question.
    ///
    /// An accepted answer is revealed immediately and the session advances once
    /// the dwell has elapsed.
    pub async fn answer(&self, option: usize) -> AnswerOutcome {
        let mut state = self.state.lock().await;
        let outcome = self.service.answer(&mut state.session, option);
        if let Some(ticket) = outcome.ticket() {
            state.cancel_reveal();
            state.pending_reveal = Some(self.schedule_reveal(ticket));
            self.publish(&state);
        }
        outcome
    }

    fn schedule_reveal(&self, ticket: AdvanceTicket) -> JoinHandle<()> {
        let driver = self.clone();
        let dwell = self.service.settings().reveal_dwell();
        tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            driver.on_reveal_elapsed(ticket).await;
        })
    }

    /// Apply an elapsed reveal. Stale tickets leave the session untouched.
    pub async fn on_reveal_elapsed(&self, ticket: AdvanceTicket) -> AdvanceOutcome {
        let (outcome, claim) = {
            let mut state = self.state.lock().await;
            let outcome = state.session.advance(ticket);
            let claim = match outcome {
                AdvanceOutcome::Stale => {
                    tracing::debug!(
                        ticket_generation = ticket.generation().value(),
                        "stale reveal timer ignored"
                    );
                    return outcome;
                }
                AdvanceOutcome::Next(_) => None,
                AdvanceOutcome::Completed(_) => state.session.claim_attempt(),
            };
            self.publish(&state);
            (outcome, claim)
        };

        if let Some(claim) = claim {
            let driver = self.clone();
            tokio::spawn(async move {
                // Failures are already surfaced through the snapshot notice.
                let _ = driver.persist(claim).await;
            });
        }
        outcome
    }

    /// Retry recording a finished playthrough whose write failed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if nothing is waiting to be recorded, or
    /// `SessionError::Persistence` if the write fails again.
    pub async fn retry_save(&self) -> Result<AttemptId, SessionError> {
        let claim = {
            let mut state = self.state.lock().await;
            if let Some(id) = state.session.attempt_id() {
                return Ok(id);
            }
            let claim = state
                .session
                .claim_attempt()
                .ok_or(SessionError::NotComplete)?;
            state.notice = None;
            self.publish(&state);
            claim
        };
        self.persist(claim).await
    }

    async fn persist(&self, claim: CompletedAttempt) -> Result<AttemptId, SessionError> {
        let written = self
            .service
            .ledger()
            .record_attempt(claim.user_id, claim.score, claim.total)
            .await;

        {
            let mut state = self.state.lock().await;
            match &written {
                Ok(id) => {
                    state.session.mark_attempt_saved(claim.generation, *id);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to save quiz attempt");
                    if state.session.mark_attempt_failed(claim.generation) {
                        state.notice = Some(SessionNotice::SaveFailed);
                    }
                }
            }
            self.publish(&state);
        }

        if written.is_ok() {
            self.refresh_history().await;
        }
        written
    }

    /// Reload the recent-attempts list for the signed-in player.
    ///
    /// Overlapping refreshes may finish in any order; only the most recently issued
    /// one that has completed is kept.
    pub async fn refresh_history(&self) {
        let request = {
            let mut state = self.state.lock().await;
            state.history_issued += 1;
            state.history_issued
        };

        let loaded = self.service.history().await;

        let mut state = self.state.lock().await;
        if request < state.history_applied {
            tracing::debug!(
                request,
                applied = state.history_applied,
                "dropping outdated history read"
            );
            return;
        }
        state.history_applied = request;
        match loaded {
            Ok(items) => {
                state.history = items;
                if state.notice == Some(SessionNotice::HistoryUnavailable) {
                    state.notice = None;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load attempt history");
                if state.notice.is_none() {
                    state.notice = Some(SessionNotice::HistoryUnavailable);
                }
            }
        }
        self.publish(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Clock;
    use crate::attempts::AttemptLedger;
    use crate::identity::{SharedIdentity, SignedInUser};
    use crate::sessions::{AttemptStatus, SessionPhase};
    use quiz_core::model::{Question, QuestionId, QuizSettings, UserId};
    use quiz_core::time::fixed_now;
    use std::time::Duration;
    use storage::repository::{InMemoryRepository, QuestionRepository};
    use uuid::Uuid;

    async fn driver_with(count: u64, user: UserId) -> (QuizDriver, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        for id in 1..=count {
            let q = Question::new(
                QuestionId::new(id),
                format!("Q{id}"),
                vec!["right".into(), "wrong".into(), "also wrong".into()],
                0,
            )
            .unwrap();
            repo.upsert_question(&q).await.unwrap();
        }
        let service = QuizLoopService::new(
            QuizSettings::default(),
            Arc::new(SignedInUser(user)),
            Arc::new(repo.clone()),
            AttemptLedger::new(Clock::fixed(fixed_now()), Arc::new(repo.clone())),
        );
        (QuizDriver::new(service), repo)
    }

    fn dwell() -> Duration {
        QuizSettings::default().reveal_dwell()
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_advances_after_dwell() {
        let (driver, _) = driver_with(3, UserId::new(Uuid::new_v4())).await;
        driver.restart().await.unwrap();
        let mut rx = driver.subscribe();

        driver.answer(0).await;
        let revealed = driver.snapshot();
        assert_eq!(revealed.phase, SessionPhase::Revealing(0));
        assert_eq!(revealed.question.as_ref().unwrap().correct_index, Some(0));
        assert_eq!(revealed.last_answer_correct, Some(true));

        let next = rx
            .wait_for(|s| s.phase == SessionPhase::Presenting(1))
            .await
            .unwrap()
            .clone();
        assert_eq!(next.score, 1);
        assert_eq!(next.question.unwrap().correct_index, None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_answer_during_dwell_is_ignored() {
        let (driver, _) = driver_with(2, UserId::new(Uuid::new_v4())).await;
        driver.restart().await.unwrap();

        assert!(driver.answer(1).await.ticket().is_some());
        assert!(matches!(driver.answer(0).await, AnswerOutcome::Ignored(_)));
        assert_eq!(driver.snapshot().selected, Some(1));
        assert_eq!(driver.snapshot().score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_records_exactly_one_attempt() {
        let user = UserId::new(Uuid::new_v4());
        let (driver, _) = driver_with(2, user).await;
        driver.restart().await.unwrap();
        let mut rx = driver.subscribe();

        driver.answer(0).await;
        rx.wait_for(|s| s.phase == SessionPhase::Presenting(1))
            .await
            .unwrap();
        driver.answer(2).await;

        let done = rx
            .wait_for(|s| matches!(s.attempt, AttemptStatus::Saved(_)))
            .await
            .unwrap()
            .clone();
        assert!(done.complete);
        assert_eq!(done.score, 1);

        let history = rx.wait_for(|s| !s.history.is_empty()).await.unwrap().clone();
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].total, 2);
        assert_eq!(history.history[0].ordinal, 1);

        tokio::time::sleep(dwell() * 4).await;
        let stored = driver.service().ledger().list_attempts(user).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_during_dwell_drops_the_old_timer() {
        let (driver, _) = driver_with(1, UserId::new(Uuid::new_v4())).await;
        driver.restart().await.unwrap();
        driver.answer(0).await;

        tokio::time::sleep(dwell() / 2).await;
        driver.restart().await.unwrap();
        tokio::time::sleep(dwell() * 2).await;

        let snapshot = driver.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Presenting(0));
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.attempt, AttemptStatus::NotDue);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticket_is_ignored_after_restart() {
        let (driver, _) = driver_with(2, UserId::new(Uuid::new_v4())).await;
        driver.restart().await.unwrap();
        let ticket = driver.answer(0).await.ticket().unwrap();
        driver.restart().await.unwrap();

        assert_eq!(driver.on_reveal_elapsed(ticket).await, AdvanceOutcome::Stale);
        assert_eq!(driver.snapshot().phase, SessionPhase::Presenting(0));
    }

    #[tokio::test]
    async fn signed_out_restart_publishes_notice() {
        let repo = InMemoryRepository::new();
        let identity = SharedIdentity::default();
        let service = QuizLoopService::new(
            QuizSettings::default(),
            Arc::new(identity.clone()),
            Arc::new(repo.clone()),
            AttemptLedger::new(Clock::fixed(fixed_now()), Arc::new(repo)),
        );
        let driver = QuizDriver::new(service);

        let err = driver.restart().await.unwrap_err();
        assert!(matches!(err, SessionError::NotSignedIn));
        let snapshot = driver.snapshot();
        assert!(snapshot.is_loading());
        assert_eq!(snapshot.notice, Some(SessionNotice::NotSignedIn));
    }

    #[tokio::test]
    async fn retry_save_without_completion_is_rejected() {
        let (driver, _) = driver_with(1, UserId::new(Uuid::new_v4())).await;
        driver.restart().await.unwrap();
        let err = driver.retry_save().await.unwrap_err();
        assert!(matches!(err, SessionError::NotComplete));
    }
}

use std::fmt;

use quiz_core::model::{AttemptId, Question, UserId};
use serde::Serialize;

use super::progress::SessionProgress;
use super::view::{QuestionView, SessionSnapshot};
use crate::error::SessionError;

//
// ─── IDENTIFIERS & PHASES ──────────────────────────────────────────────────────
//

/// Incremented on every reset so late fetches and reveal timers from a discarded
/// playthrough can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct SessionGeneration(u64);

impl SessionGeneration {
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "index", rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Presenting(usize),
    Revealing(usize),
    Complete,
}

/// Scheduled transition out of `Revealing`, bound to one question of one playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceTicket {
    generation: SessionGeneration,
    index: usize,
}

impl AdvanceTicket {
    #[must_use]
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Started,
    /// The fetch belonged to a playthrough that has since been reset.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredAnswer {
    NotReady,
    AlreadyAnswered,
    Completed,
    OptionOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Accepted {
        selected: usize,
        correct: bool,
        ticket: AdvanceTicket,
    },
    Ignored(IgnoredAnswer),
}

impl AnswerOutcome {
    #[must_use]
    pub fn ticket(&self) -> Option<AdvanceTicket> {
        match self {
            AnswerOutcome::Accepted { ticket, .. } => Some(*ticket),
            AnswerOutcome::Ignored(_) => None,
        }
    }
}

/// Final score of a finished playthrough, handed out once for recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedAttempt {
    pub generation: SessionGeneration,
    pub user_id: UserId,
    pub score: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Next(usize),
    Completed(CompletedAttempt),
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum AttemptStatus {
    #[default]
    NotDue,
    Unrecorded,
    Saving,
    Saved(AttemptId),
    Failed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Loading,
    Active,
    Complete,
}

/// One playthrough of the quiz.
///
/// Pure state: no I/O and no timers. `QuizLoopService` and `QuizDriver` wire it to
/// storage and to the reveal dwell.
pub struct QuizSession {
    generation: SessionGeneration,
    stage: Stage,
    user_id: Option<UserId>,
    questions: Vec<Question>,
    current: usize,
    score: u32,
    selected: Option<usize>,
    answered: bool,
    last_answer_correct: Option<bool>,
    attempt: AttemptStatus,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generation: SessionGeneration::default(),
            stage: Stage::Loading,
            user_id: None,
            questions: Vec::new(),
            current: 0,
            score: 0,
            selected: None,
            answered: false,
            last_answer_correct: None,
            attempt: AttemptStatus::NotDue,
        }
    }

    /// Discard the current playthrough and return to `Loading` under a new generation.
    pub fn reset(&mut self) -> SessionGeneration {
        let generation = self.generation.next();
        *self = Self::new();
        self.generation = generation;
        generation
    }

    /// Install the fetched questions and present the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when `questions` is empty; the session stays in `Loading`.
    pub fn begin(
        &mut self,
        generation: SessionGeneration,
        user_id: UserId,
        questions: Vec<Question>,
    ) -> Result<BeginOutcome, SessionError> {
        if generation != self.generation || self.stage != Stage::Loading {
            return Ok(BeginOutcome::Stale);
        }
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        self.user_id = Some(user_id);
        self.questions = questions;
        self.current = 0;
        self.stage = Stage::Active;
        Ok(BeginOutcome::Started)
    }

    /// Accept the player's answer for the current question.
    ///
    /// Only the first answer per question counts; anything else is ignored without
    /// touching state.
    pub fn answer(&mut self, option: usize) -> AnswerOutcome {
        match self.stage {
            Stage::Loading => return AnswerOutcome::Ignored(IgnoredAnswer::NotReady),
            Stage::Complete => return AnswerOutcome::Ignored(IgnoredAnswer::Completed),
            Stage::Active => {}
        }
        if self.answered {
            return AnswerOutcome::Ignored(IgnoredAnswer::AlreadyAnswered);
        }
        let Some(question) = self.questions.get(self.current) else {
            return AnswerOutcome::Ignored(IgnoredAnswer::NotReady);
        };
        if !question.has_option(option) {
            return AnswerOutcome::Ignored(IgnoredAnswer::OptionOutOfRange {
                index: option,
                len: question.option_count(),
            });
        }

        let correct = question.is_correct(option);
        self.selected = Some(option);
        self.answered = true;
        self.last_answer_correct = Some(correct);
        if correct {
            self.score += 1;
        }

        AnswerOutcome::Accepted {
            selected: option,
            correct,
            ticket: AdvanceTicket {
                generation: self.generation,
                index: self.current,
            },
        }
    }

    /// Leave `Revealing` for the next question or for `Complete`.
    ///
    /// Tickets from an earlier generation or another question are reported as `Stale`.
    pub fn advance(&mut self, ticket: AdvanceTicket) -> AdvanceOutcome {
        let in_reveal = self.stage == Stage::Active && self.answered;
        if ticket.generation != self.generation || ticket.index != self.current || !in_reveal {
            return AdvanceOutcome::Stale;
        }

        self.selected = None;
        self.answered = false;
        self.current += 1;

        if self.current < self.questions.len() {
            return AdvanceOutcome::Next(self.current);
        }

        self.stage = Stage::Complete;
        self.attempt = AttemptStatus::Unrecorded;
        match self.completed_attempt() {
            Some(done) => AdvanceOutcome::Completed(done),
            None => AdvanceOutcome::Stale,
        }
    }

    fn completed_attempt(&self) -> Option<CompletedAttempt> {
        if self.stage != Stage::Complete {
            return None;
        }
        Some(CompletedAttempt {
            generation: self.generation,
            user_id: self.user_id?,
            score: self.score,
            total: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
        })
    }

    /// Claim the finished attempt for recording.
    ///
    /// Yields at most one claim at a time; a failed write must be released with
    /// `mark_attempt_failed` before it can be claimed again.
    pub fn claim_attempt(&mut self) -> Option<CompletedAttempt> {
        match self.attempt {
            AttemptStatus::Unrecorded | AttemptStatus::Failed => {
                let done = self.completed_attempt()?;
                self.attempt = AttemptStatus::Saving;
                Some(done)
            }
            AttemptStatus::NotDue | AttemptStatus::Saving | AttemptStatus::Saved(_) => None,
        }
    }

    pub fn mark_attempt_saved(&mut self, generation: SessionGeneration, id: AttemptId) -> bool {
        if generation != self.generation || self.attempt != AttemptStatus::Saving {
            return false;
        }
        self.attempt = AttemptStatus::Saved(id);
        true
    }

    pub fn mark_attempt_failed(&mut self, generation: SessionGeneration) -> bool {
        if generation != self.generation || self.attempt != AttemptStatus::Saving {
            return false;
        }
        self.attempt = AttemptStatus::Failed;
        true
    }

    #[must_use]
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self.stage {
            Stage::Loading => SessionPhase::Loading,
            Stage::Complete => SessionPhase::Complete,
            Stage::Active if self.answered => SessionPhase::Revealing(self.current),
            Stage::Active => SessionPhase::Presenting(self.current),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.stage {
            Stage::Active => self.questions.get(self.current),
            Stage::Loading | Stage::Complete => None,
        }
    }

    /// 0-based question pointer; equals `total()` once complete.
    #[must_use]
    pub fn pointer(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.stage == Stage::Loading
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    #[must_use]
    pub fn last_answer_correct(&self) -> Option<bool> {
        self.last_answer_correct
    }

    #[must_use]
    pub fn attempt_status(&self) -> AttemptStatus {
        self.attempt
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        match self.attempt {
            AttemptStatus::Saved(id) => Some(id),
            _ => None,
        }
    }

    /// Questions responded to so far, including one currently being revealed.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.current + usize::from(self.answered)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total(),
            answered: self.answered_count(),
            remaining: self.total().saturating_sub(self.answered_count()),
            score: self.score,
            is_complete: self.is_complete(),
        }
    }

    /// Everything the presentation layer needs to render the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let question = self.current_question().map(|q| QuestionView {
            id: q.id(),
            number: self.current + 1,
            prompt: q.prompt().to_owned(),
            options: q.options().to_vec(),
            correct_index: self.answered.then_some(q.correct_index()),
        });

        SessionSnapshot {
            generation: self.generation,
            phase: self.phase(),
            progress: self.progress(),
            question,
            total: self.total(),
            score: self.score,
            selected: self.selected,
            answered: self.answered,
            complete: self.is_complete(),
            last_answer_correct: self.last_answer_correct,
            attempt: self.attempt,
            history: Vec::new(),
            notice: None,
        }
    }
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("generation", &self.generation)
            .field("phase", &self.phase())
            .field("questions_len", &self.questions.len())
            .field("score", &self.score)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

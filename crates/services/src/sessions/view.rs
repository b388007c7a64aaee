use quiz_core::model::QuestionId;
use serde::Serialize;

use super::progress::SessionProgress;
use super::service::{AttemptStatus, SessionGeneration, SessionPhase};
use crate::attempts::AttemptListItem;

/// The active question as the player sees it.
///
/// `correct_index` stays hidden until the question has been answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub number: usize,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
}

/// Recoverable problems worth telling the player about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionNotice {
    NotSignedIn,
    SourceUnavailable,
    EmptyQuestionSet,
    SaveFailed,
    HistoryUnavailable,
}

impl SessionNotice {
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            SessionNotice::NotSignedIn => "Please sign in to take the quiz",
            SessionNotice::SourceUnavailable => "Failed to load questions",
            SessionNotice::EmptyQuestionSet => "No quiz questions are available yet",
            SessionNotice::SaveFailed => "Failed to save quiz results",
            SessionNotice::HistoryUnavailable => "Could not load your previous attempts",
        }
    }
}

/// State pushed to the presentation layer after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub generation: SessionGeneration,
    pub phase: SessionPhase,
    pub progress: SessionProgress,
    pub question: Option<QuestionView>,
    pub total: usize,
    pub score: u32,
    pub selected: Option<usize>,
    pub answered: bool,
    pub complete: bool,
    pub last_answer_correct: Option<bool>,
    pub attempt: AttemptStatus,
    pub history: Vec<AttemptListItem>,
    pub notice: Option<SessionNotice>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }
}

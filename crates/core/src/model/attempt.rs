use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("score ({score}) exceeds total question count ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// Immutable summary of one completed quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    id: AttemptId,
    user_id: UserId,
    score: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Build an attempt record, either freshly completed or rehydrated from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ScoreExceedsTotal` if `score > total_questions`.
    pub fn new(
        id: AttemptId,
        user_id: UserId,
        score: u32,
        total_questions: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if score > total_questions {
            return Err(AttemptError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }

        Ok(Self {
            id,
            user_id,
            score,
            total_questions,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Fraction of correct answers; an empty attempt counts as 0.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_questions)
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.score == self.total_questions
    }
}

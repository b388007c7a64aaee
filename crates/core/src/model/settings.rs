use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question limit must be at least 1")]
    InvalidQuestionLimit,

    #[error("reveal dwell must not exceed {max_ms} ms")]
    InvalidRevealDwell { max_ms: u64 },

    #[error("history limit must be at least 1")]
    InvalidHistoryLimit,
}

/// Tunables for a quiz playthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    question_limit: u32,
    reveal_dwell: Duration,
    history_limit: u32,
}

impl QuizSettings {
    pub const DEFAULT_QUESTION_LIMIT: u32 = 10;
    pub const DEFAULT_REVEAL_DWELL_MS: u64 = 1_500;
    pub const DEFAULT_HISTORY_LIMIT: u32 = 5;
    pub const MAX_REVEAL_DWELL_MS: u64 = 60_000;

    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a limit is zero or the dwell is longer than a minute.
    pub fn new(
        question_limit: u32,
        reveal_dwell: Duration,
        history_limit: u32,
    ) -> Result<Self, SettingsError> {
        if question_limit == 0 {
            return Err(SettingsError::InvalidQuestionLimit);
        }
        if reveal_dwell > Duration::from_millis(Self::MAX_REVEAL_DWELL_MS) {
            return Err(SettingsError::InvalidRevealDwell {
                max_ms: Self::MAX_REVEAL_DWELL_MS,
            });
        }
        if history_limit == 0 {
            return Err(SettingsError::InvalidHistoryLimit);
        }

        Ok(Self {
            question_limit,
            reveal_dwell,
            history_limit,
        })
    }

    /// Maximum number of questions pulled into a single session.
    #[must_use]
    pub fn question_limit(&self) -> u32 {
        self.question_limit
    }

    /// How long the answered question stays on screen before advancing.
    #[must_use]
    pub fn reveal_dwell(&self) -> Duration {
        self.reveal_dwell
    }

    /// Number of past attempts shown in the progress panel.
    #[must_use]
    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_limit: Self::DEFAULT_QUESTION_LIMIT,
            reveal_dwell: Duration::from_millis(Self::DEFAULT_REVEAL_DWELL_MS),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
        }
    }
}

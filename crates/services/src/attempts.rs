use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use quiz_core::model::{AttemptId, AttemptRecord, UserId};
use storage::repository::{AttemptRepository, InMemoryRepository};

use crate::Clock;
use crate::error::SessionError;

/// Presentation-agnostic row for the "your progress" list.
///
/// `ordinal` is the 1-based attempt number counted from the oldest attempt,
/// so the newest of five attempts is `Attempt 5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub ordinal: usize,
    pub score: u32,
    pub total: u32,
    pub completed_at: DateTime<Utc>,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_record(ordinal: usize, record: &AttemptRecord) -> Self {
        Self {
            id: record.id(),
            ordinal,
            score: record.score(),
            total: record.total_questions(),
            completed_at: record.completed_at(),
        }
    }
}

/// Aggregates derived from a user's full attempt history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptStats {
    pub attempts: usize,
    pub best_score: Option<u32>,
    pub best_ratio: Option<f64>,
    pub perfect_runs: usize,
    pub latest: Option<AttemptListItem>,
}

/// Writes completed attempts and reads them back for display.
///
/// The ledger is the only writer of attempt records and never updates or deletes them.
#[derive(Clone)]
pub struct AttemptLedger {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptLedger {
    #[must_use]
    pub fn new(clock: Clock, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { clock, attempts }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, Arc::new(InMemoryRepository::new()))
    }

    /// Persist one attempt stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Attempt` if `score > total`, or
    /// `SessionError::Persistence` if the store rejects the write.
    pub async fn record_attempt(
        &self,
        user_id: UserId,
        score: u32,
        total: u32,
    ) -> Result<AttemptId, SessionError> {
        let record =
            AttemptRecord::new(AttemptId::generate(), user_id, score, total, self.clock.now())?;
        self.attempts
            .append_attempt(&record)
            .await
            .map_err(SessionError::Persistence)?;
        tracing::info!(%user_id, attempt_id = %record.id(), score, total, "quiz attempt recorded");
        Ok(record.id())
    }

    /// All attempts for the user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` on repository failures.
    pub async fn list_attempts(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let records = self
            .attempts
            .list_attempts(user_id)
            .await
            .map_err(SessionError::Persistence)?;
        let count = records.len();
        Ok(records
            .iter()
            .enumerate()
            .map(|(index, record)| AttemptListItem::from_record(count - index, record))
            .collect())
    }

    /// The `limit` most recent attempts, numbered against the full history.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` on repository failures.
    pub async fn recent_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let mut items = self.list_attempts(user_id).await?;
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Persistence` on repository failures.
    pub async fn stats(&self, user_id: UserId) -> Result<AttemptStats, SessionError> {
        let records = self
            .attempts
            .list_attempts(user_id)
            .await
            .map_err(SessionError::Persistence)?;

        let best_score = records.iter().map(AttemptRecord::score).max();
        let best_ratio = records
            .iter()
            .map(AttemptRecord::ratio)
            .max_by(f64::total_cmp);
        let perfect_runs = records.iter().filter(|r| r.is_perfect()).count();
        let latest = records
            .first()
            .map(|r| AttemptListItem::from_record(records.len(), r));

        Ok(AttemptStats {
            attempts: records.len(),
            best_score,
            best_ratio,
            perfect_runs,
            latest,
        })
    }
}

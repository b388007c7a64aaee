use async_trait::async_trait;
use quiz_core::model::{AttemptId, AttemptRecord, Question, QuestionId, UserId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to the question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Fetch up to `limit` questions in stored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or a row is malformed.
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError>;

    /// Persist or replace a question. Used for seeding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;
}

/// Append-only store of completed attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Insert a new attempt record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken, or other storage errors.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StorageError>;

    /// Fetch a single attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError>;

    /// All attempts for a user, newest `completed_at` first.
    ///
    /// Ties on `completed_at` are broken by insertion order, latest insert first.
    /// A user with no attempts yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.values().take(limit).cloned().collect())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|a| a.id() == attempt.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|a| a.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Reverse first so the stable sort keeps later inserts ahead on equal timestamps.
        let mut out: Vec<AttemptRecord> = guard
            .iter()
            .rev()
            .filter(|a| a.user_id() == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
        Ok(out)
    }
}

/// Aggregates the question bank and attempt store behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            questions,
            attempts,
        }
    }
}

use quiz_core::model::{AttemptId, AttemptRecord, UserId};

use super::SqliteRepository;
use super::mapping::map_attempt_row;
use crate::repository::{AttemptRepository, StorageError};

fn map_insert_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO quiz_attempts (id, user_id, score, total_questions, completed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(attempt.id().to_string())
        .bind(attempt.user_id().to_string())
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total_questions()))
        .bind(attempt.completed_at())
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, score, total_questions, completed_at
                FROM quiz_attempts
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, score, total_questions, completed_at
                FROM quiz_attempts
                WHERE user_id = ?1
                ORDER BY completed_at DESC, rowid DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}

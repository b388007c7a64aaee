use quiz_core::model::Question;

use super::SqliteRepository;
use super::mapping::{id_i64, map_question_row, options_to_json};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, question, options, correct_answer
                FROM quiz_questions
                ORDER BY id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let correct = i64::try_from(question.correct_index())
            .map_err(|_| StorageError::Serialization("correct_answer overflow".into()))?;

        sqlx::query(
            r"
                INSERT INTO quiz_questions (id, question, options, correct_answer)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    question = excluded.question,
                    options = excluded.options,
                    correct_answer = excluded.correct_answer
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(question.prompt())
        .bind(options_to_json(question.options())?)
        .bind(correct)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

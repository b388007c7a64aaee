use quiz_core::model::{AttemptId, AttemptRecord, Question, QuestionId, UserId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization("question id sign overflow".into()))
}

/// Options are stored as a JSON array so their order survives the round trip.
pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn options_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let prompt: String = row.try_get("question").map_err(ser)?;
    let options = options_from_json(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let correct = row.try_get::<i64, _>("correct_answer").map_err(ser)?;
    let correct = usize::try_from(correct)
        .map_err(|_| StorageError::Serialization(format!("invalid correct_answer: {correct}")))?;

    Question::new(id, prompt, options, correct).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRecord, StorageError> {
    let id: AttemptId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let user_id: UserId = row
        .try_get::<String, _>("user_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    AttemptRecord::new(id, user_id, score, total, completed_at).map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_json_preserves_order() {
        let options = vec!["Rust".to_string(), "Mildew".to_string(), "Canker".to_string()];
        let raw = options_to_json(&options).unwrap();
        assert_eq!(raw, r#"["Rust","Mildew","Canker"]"#);
        assert_eq!(options_from_json(&raw).unwrap(), options);
    }

    #[test]
    fn malformed_options_are_serialization_errors() {
        let err = options_from_json("not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn negative_question_id_is_rejected() {
        assert!(question_id_from_i64(-1).is_err());
        assert_eq!(question_id_from_i64(7).unwrap(), QuestionId::new(7));
    }
}

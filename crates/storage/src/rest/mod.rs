//! Hosted PostgREST-style backend.
//!
//! Talks to `/rest/v1/<table>` endpoints with an anon/service key, the same shape the
//! hosted web app used for `quiz_questions` and `quiz_attempts`.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptId, AttemptRecord, Question, QuestionId, UserId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::repository::{AttemptRepository, QuestionRepository, Storage, StorageError};

const QUESTIONS_TABLE: &str = "quiz_questions";
const ATTEMPTS_TABLE: &str = "quiz_attempts";
const ATTEMPT_COLUMNS: &str = "id,user_id,score,total_questions,completed_at";

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RestConfig {
    /// Reads `QUIZ_REST_URL` and `QUIZ_REST_KEY`; `None` unless both are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_REST_URL").ok()?;
        let api_key = env::var("QUIZ_REST_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Clone)]
pub struct RestRepository {
    client: Client,
    config: RestConfig,
}

impl RestRepository {
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StorageError> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        check_status(response.status())?;
        Ok(response)
    }
}

fn check_status(status: StatusCode) -> Result<(), StorageError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::NOT_FOUND => Err(StorageError::NotFound),
        StatusCode::CONFLICT => Err(StorageError::Conflict),
        other => Err(StorageError::Connection(format!(
            "request failed with status {other}"
        ))),
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionRow {
    id: u64,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
}

impl QuestionRow {
    fn from_question(q: &Question) -> Self {
        Self {
            id: q.id().value(),
            question: q.prompt().to_owned(),
            options: q.options().to_vec(),
            correct_answer: q.correct_index(),
        }
    }

    fn into_question(self) -> Result<Question, StorageError> {
        Question::new(
            QuestionId::new(self.id),
            self.question,
            self.options,
            self.correct_answer,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AttemptRow {
    id: AttemptId,
    user_id: UserId,
    score: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
}

impl AttemptRow {
    fn from_record(r: &AttemptRecord) -> Self {
        Self {
            id: r.id(),
            user_id: r.user_id(),
            score: r.score(),
            total_questions: r.total_questions(),
            completed_at: r.completed_at(),
        }
    }

    fn into_record(self) -> Result<AttemptRecord, StorageError> {
        AttemptRecord::new(
            self.id,
            self.user_id,
            self.score,
            self.total_questions,
            self.completed_at,
        )
        .map_err(ser)
    }
}

#[async_trait]
impl QuestionRepository for RestRepository {
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let request = self
            .client
            .get(self.config.table_url(QUESTIONS_TABLE))
            .query(&[
                ("select", "id,question,options,correct_answer".to_string()),
                ("order", "id.asc".to_string()),
                ("limit", limit.to_string()),
            ]);
        let rows: Vec<QuestionRow> = self.send(request).await?.json().await.map_err(ser)?;
        rows.into_iter().map(QuestionRow::into_question).collect()
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let request = self
            .client
            .post(self.config.table_url(QUESTIONS_TABLE))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[QuestionRow::from_question(question)]);
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for RestRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StorageError> {
        let request = self
            .client
            .post(self.config.table_url(ATTEMPTS_TABLE))
            .header("Prefer", "return=minimal")
            .json(&[AttemptRow::from_record(attempt)]);
        self.send(request).await?;
        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let request = self
            .client
            .get(self.config.table_url(ATTEMPTS_TABLE))
            .query(&[
                ("select", ATTEMPT_COLUMNS.to_string()),
                ("id", format!("eq.{id}")),
            ]);
        let rows: Vec<AttemptRow> = self.send(request).await?.json().await.map_err(ser)?;
        rows.into_iter()
            .next()
            .ok_or(StorageError::NotFound)?
            .into_record()
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AttemptRecord>, StorageError> {
        let request = self
            .client
            .get(self.config.table_url(ATTEMPTS_TABLE))
            .query(&[
                ("select", ATTEMPT_COLUMNS.to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "completed_at.desc".to_string()),
            ]);
        let rows: Vec<AttemptRow> = self.send(request).await?.json().await.map_err(ser)?;
        rows.into_iter().map(AttemptRow::into_record).collect()
    }
}

impl Storage {
    /// Build a `Storage` backed by the hosted REST store.
    #[must_use]
    pub fn rest(config: RestConfig) -> Self {
        let repo = RestRepository::new(config);
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            questions,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    #[test]
    fn table_url_trims_trailing_slash() {
        let config = RestConfig {
            base_url: "https://example.supabase.co/".into(),
            api_key: "anon".into(),
        };
        assert_eq!(
            config.table_url(ATTEMPTS_TABLE),
            "https://example.supabase.co/rest/v1/quiz_attempts"
        );
    }

    #[test]
    fn question_rows_decode_and_validate() {
        let raw = r#"[
            {"id": 4, "question": "Powdery mildew looks like?", "options": ["White dust", "Black spots"], "correct_answer": 0},
            {"id": 5, "question": "Broken?", "options": ["only one"], "correct_answer": 0}
        ]"#;
        let rows: Vec<QuestionRow> = serde_json::from_str(raw).unwrap();
        let mut rows = rows.into_iter();

        let ok = rows.next().unwrap().into_question().unwrap();
        assert_eq!(ok.id(), QuestionId::new(4));
        assert_eq!(ok.options()[0], "White dust");

        let bad = rows.next().unwrap().into_question().unwrap_err();
        assert!(matches!(bad, StorageError::Serialization(_)));
    }

    #[test]
    fn attempt_row_uses_hosted_column_names() {
        let record = AttemptRecord::new(
            AttemptId::generate(),
            "6f1c1a52-8d0e-4c59-9a43-3f1b2f0c7d11".parse().unwrap(),
            7,
            10,
            fixed_now(),
        )
        .unwrap();
        let json = serde_json::to_value(AttemptRow::from_record(&record)).unwrap();

        assert_eq!(json["user_id"], "6f1c1a52-8d0e-4c59-9a43-3f1b2f0c7d11");
        assert_eq!(json["score"], 7);
        assert_eq!(json["total_questions"], 10);

        let back: AttemptRow = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_record().unwrap(), record);
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(StatusCode::CREATED).is_ok());
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND),
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            check_status(StatusCode::CONFLICT),
            Err(StorageError::Conflict)
        ));
        assert!(matches!(
            check_status(StatusCode::SERVICE_UNAVAILABLE),
            Err(StorageError::Connection(_))
        ));
    }
}

use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::model::Question;
use storage::repository::QuestionRepository;

use crate::error::SessionError;

/// Pulls a bounded question set and hands it out in a fresh random order.
///
/// Only question order is shuffled; each question keeps its stored option order.
#[derive(Clone)]
pub struct QuestionSource {
    questions: Arc<dyn QuestionRepository>,
    limit: u32,
}

impl QuestionSource {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>, limit: u32) -> Self {
        Self { questions, limit }
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Fetch up to `limit` questions and shuffle their order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SourceUnavailable` if the store read fails and
    /// `SessionError::Empty` if it returns no questions.
    pub async fn fetch_questions(&self) -> Result<Vec<Question>, SessionError> {
        let mut pool = self
            .questions
            .fetch_questions(self.limit)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "question fetch failed");
                SessionError::SourceUnavailable(e)
            })?;

        pool.truncate(usize::try_from(self.limit).unwrap_or(usize::MAX));
        if pool.is_empty() {
            return Err(SessionError::Empty);
        }

        pool.as_mut_slice().shuffle(&mut rng());
        tracing::debug!(count = pool.len(), "fetched and shuffled questions");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;
    use std::collections::HashSet;
    use storage::repository::InMemoryRepository;

    async fn seeded(count: u64) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for id in 1..=count {
            let q = Question::new(
                QuestionId::new(id),
                format!("Q{id}"),
                vec!["a".into(), "b".into(), "c".into()],
                usize::try_from(id % 3).unwrap(),
            )
            .unwrap();
            repo.upsert_question(&q).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn returns_a_permutation_capped_at_limit() {
        let repo = seeded(15).await;
        let source = QuestionSource::new(Arc::new(repo), 10);

        let fetched = source.fetch_questions().await.unwrap();
        assert_eq!(fetched.len(), 10);

        let ids: HashSet<u64> = fetched.iter().map(|q| q.id().value()).collect();
        let expected: HashSet<u64> = (1..=10).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn option_order_is_untouched() {
        let repo = seeded(5).await;
        let source = QuestionSource::new(Arc::new(repo), 10);

        for q in source.fetch_questions().await.unwrap() {
            assert_eq!(q.options(), ["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn order_is_reshuffled_between_fetches() {
        let repo = seeded(10).await;
        let source = QuestionSource::new(Arc::new(repo), 10);

        let mut orders = HashSet::new();
        for _ in 0..20 {
            let order: Vec<u64> = source
                .fetch_questions()
                .await
                .unwrap()
                .iter()
                .map(|q| q.id().value())
                .collect();
            orders.insert(order);
        }
        assert!(orders.len() > 1);
    }

    #[tokio::test]
    async fn empty_bank_is_rejected() {
        let source = QuestionSource::new(Arc::new(InMemoryRepository::new()), 10);
        let err = source.fetch_questions().await.unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }
}

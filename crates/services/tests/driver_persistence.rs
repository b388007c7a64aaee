use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use quiz_core::model::{AttemptId, AttemptRecord, Question, QuestionId, QuizSettings, UserId};
use quiz_core::time::fixed_now;
use services::{
    AttemptLedger, AttemptStatus, Clock, QuizDriver, QuizLoopService, SessionNotice, SessionPhase,
    SignedInUser,
};
use storage::repository::{
    AttemptRepository, InMemoryRepository, QuestionRepository, StorageError,
};
use tokio::sync::Notify;
use uuid::Uuid;

/// Attempt store whose writes can be switched off and whose next listing can be held.
#[derive(Default)]
struct ControlledAttempts {
    inner: InMemoryRepository,
    fail_writes: AtomicBool,
    hold_next_list: AtomicBool,
    list_entered: Notify,
    list_release: Notify,
}

#[async_trait]
impl AttemptRepository for ControlledAttempts {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("write rejected".into()));
        }
        self.inner.append_attempt(attempt).await
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        self.inner.get_attempt(id).await
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = self.inner.list_attempts(user_id).await?;
        if self.hold_next_list.swap(false, Ordering::SeqCst) {
            self.list_entered.notify_one();
            self.list_release.notified().await;
        }
        Ok(rows)
    }
}

async fn setup(count: u64) -> (QuizDriver, Arc<ControlledAttempts>, UserId) {
    let questions = InMemoryRepository::new();
    for id in 1..=count {
        let q = Question::new(
            QuestionId::new(id),
            format!("Q{id}?"),
            vec!["x".into(), "y".into()],
            1,
        )
        .unwrap();
        questions.upsert_question(&q).await.unwrap();
    }
    let attempts = Arc::new(ControlledAttempts::default());
    let user = UserId::new(Uuid::new_v4());
    let service = QuizLoopService::new(
        QuizSettings::default(),
        Arc::new(SignedInUser(user)),
        Arc::new(questions),
        AttemptLedger::new(Clock::fixed(fixed_now()), attempts.clone()),
    );
    (QuizDriver::new(service), attempts, user)
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_completion_and_retry_writes_once() {
    let (driver, attempts, user) = setup(1).await;
    attempts.fail_writes.store(true, Ordering::SeqCst);
    driver.restart().await.unwrap();
    let mut rx = driver.subscribe();

    assert!(driver.answer(1).await.ticket().is_some());
    let failed = rx
        .wait_for(|s| s.attempt == AttemptStatus::Failed)
        .await
        .unwrap()
        .clone();
    assert_eq!(failed.phase, SessionPhase::Complete);
    assert_eq!(failed.score, 1);
    assert_eq!(failed.total, 1);
    assert_eq!(failed.notice, Some(SessionNotice::SaveFailed));
    assert!(attempts.inner.list_attempts(user).await.unwrap().is_empty());

    attempts.fail_writes.store(false, Ordering::SeqCst);
    let first = driver.retry_save().await.unwrap();
    let second = driver.retry_save().await.unwrap();
    assert_eq!(first, second);

    let stored = attempts.inner.list_attempts(user).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id(), first);
    assert_eq!(stored[0].score(), 1);

    let snapshot = driver.snapshot();
    assert_eq!(snapshot.attempt, AttemptStatus::Saved(first));
    assert_eq!(snapshot.notice, None);
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test]
async fn slow_history_read_does_not_overwrite_newer_list() {
    let (driver, attempts, user) = setup(1).await;
    driver.restart().await.unwrap();
    assert!(driver.snapshot().history.is_empty());

    attempts.hold_next_list.store(true, Ordering::SeqCst);
    let slow = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.refresh_history().await })
    };
    attempts.list_entered.notified().await;

    driver
        .service()
        .ledger()
        .record_attempt(user, 1, 1)
        .await
        .unwrap();
    driver.refresh_history().await;
    assert_eq!(driver.snapshot().history.len(), 1);

    attempts.list_release.notify_one();
    slow.await.unwrap();
    assert_eq!(driver.snapshot().history.len(), 1);
}

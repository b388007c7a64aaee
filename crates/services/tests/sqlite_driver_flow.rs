use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Question, QuestionId, QuizSettings, UserId};
use quiz_core::time::fixed_now;
use services::{AppServices, AttemptStatus, Clock, SessionPhase, SharedIdentity};
use storage::repository::{QuestionRepository, Storage};
use uuid::Uuid;

async fn play_through(driver: &services::QuizDriver, option: usize) {
    let mut rx = driver.subscribe();
    driver.restart().await.expect("restart");
    let total = driver.snapshot().total;

    for index in 0..total {
        rx.wait_for(|s| s.phase == SessionPhase::Presenting(index))
            .await
            .expect("presenting");
        assert!(driver.answer(option).await.ticket().is_some());
    }

    rx.wait_for(|s| matches!(s.attempt, AttemptStatus::Saved(_)))
        .await
        .expect("saved");
}

#[tokio::test]
async fn driver_flow_over_sqlite_records_history() {
    let storage = Storage::sqlite("sqlite:file:memdb_driver_flow?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    for id in 1..=3 {
        let q = Question::new(
            QuestionId::new(id),
            format!("Symptom {id}?"),
            vec!["Blight".into(), "Rust".into(), "Mildew".into()],
            2,
        )
        .unwrap();
        storage.questions.upsert_question(&q).await.unwrap();
    }

    let user = UserId::new(Uuid::new_v4());
    let identity = SharedIdentity::signed_in(user);
    let settings = QuizSettings::new(3, Duration::from_millis(5), 5).unwrap();
    let app = AppServices::new(
        &storage,
        Clock::fixed(fixed_now()),
        settings,
        Arc::new(identity.clone()),
    );
    let driver = app.driver();

    play_through(&driver, 2).await;
    let mut rx = driver.subscribe();
    let first = rx
        .wait_for(|s| s.history.len() == 1)
        .await
        .expect("history")
        .clone();
    assert_eq!(first.score, 3);
    assert_eq!(first.history[0].score, 3);
    assert_eq!(first.history[0].total, 3);

    play_through(&driver, 0).await;
    let second = rx
        .wait_for(|s| s.history.len() == 2)
        .await
        .expect("history")
        .clone();
    assert_eq!(second.history[0].ordinal, 2);
    assert_eq!(second.history[0].score, 0);
    assert_eq!(second.history[1].ordinal, 1);

    identity.sign_out();
    assert!(driver.restart().await.is_err());
    assert_eq!(app.ledger().list_attempts(user).await.unwrap().len(), 2);
}

use chrono::Duration;
use quiz_core::model::{AttemptId, AttemptRecord, Question, QuestionId, UserId};
use quiz_core::time::fixed_now;
use storage::repository::{AttemptRepository, QuestionRepository, StorageError};
use storage::sqlite::SqliteRepository;
use uuid::Uuid;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn question(id: u64, correct: usize) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Question {id}?"),
        vec!["first".into(), "second".into(), "third".into()],
        correct,
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_questions_roundtrip_with_option_order() {
    let repo = connect("memdb_questions").await;

    for id in [2, 1, 3] {
        repo.upsert_question(&question(id, 2)).await.unwrap();
    }
    // Upsert replaces in place.
    repo.upsert_question(&question(1, 1)).await.unwrap();

    let fetched = repo.fetch_questions(10).await.unwrap();
    assert_eq!(fetched.len(), 3);
    assert_eq!(fetched[0].id(), QuestionId::new(1));
    assert_eq!(fetched[0].correct_index(), 1);
    assert_eq!(fetched[0].options(), ["first", "second", "third"]);

    let limited = repo.fetch_questions(2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn sqlite_attempts_list_newest_first() {
    let repo = connect("memdb_attempts").await;
    let user = UserId::new(Uuid::new_v4());
    let other = UserId::new(Uuid::new_v4());
    let now = fixed_now();

    let older = AttemptRecord::new(AttemptId::generate(), user, 3, 10, now).unwrap();
    let newer =
        AttemptRecord::new(AttemptId::generate(), user, 8, 10, now + Duration::hours(1)).unwrap();
    let foreign = AttemptRecord::new(AttemptId::generate(), other, 1, 10, now).unwrap();

    repo.append_attempt(&newer).await.unwrap();
    repo.append_attempt(&older).await.unwrap();
    repo.append_attempt(&foreign).await.unwrap();

    let listed = repo.list_attempts(user).await.unwrap();
    assert_eq!(listed, vec![newer.clone(), older]);

    let fetched = repo.get_attempt(newer.id()).await.unwrap();
    assert_eq!(fetched.score(), 8);
}

#[tokio::test]
async fn sqlite_attempts_are_insert_only() {
    let repo = connect("memdb_attempts_conflict").await;
    let user = UserId::new(Uuid::new_v4());
    let attempt = AttemptRecord::new(AttemptId::generate(), user, 1, 1, fixed_now()).unwrap();

    repo.append_attempt(&attempt).await.unwrap();
    let err = repo.append_attempt(&attempt).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let missing = repo.get_attempt(AttemptId::generate()).await.unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_empty_history_is_empty_list() {
    let repo = connect("memdb_empty_history").await;
    let listed = repo
        .list_attempts(UserId::new(Uuid::new_v4()))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn sqlite_blank_text_does_not_break_fetch() {
    let repo = connect("memdb_blank_text").await;
    let blank = Question::new(QuestionId::new(1), "", vec![String::new(), "y".into()], 1).unwrap();
    repo.upsert_question(&blank).await.unwrap();
    repo.upsert_question(&question(2, 0)).await.unwrap();

    let fetched = repo.fetch_questions(10).await.unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].prompt(), "");
    assert_eq!(fetched[0].options()[0], "");
}

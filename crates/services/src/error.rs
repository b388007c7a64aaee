//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::AttemptError;
use storage::repository::StorageError;

/// Errors emitted by the quiz session services.
///
/// Rejected answers and stale timers are not errors; they come back as
/// `AnswerOutcome::Ignored` and `AdvanceOutcome::Stale`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no signed-in user")]
    NotSignedIn,
    #[error("no questions available for session")]
    Empty,
    #[error("question source unavailable: {0}")]
    SourceUnavailable(#[source] StorageError),
    #[error("attempt persistence failed: {0}")]
    Persistence(#[source] StorageError),
    #[error("session is not complete")]
    NotComplete,
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

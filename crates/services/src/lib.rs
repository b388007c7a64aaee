#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempts;
pub mod error;
pub mod identity;
pub mod question_source;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use attempts::{AttemptLedger, AttemptListItem, AttemptStats};
pub use error::SessionError;
pub use identity::{IdentityProvider, SharedIdentity, SignedInUser, SignedOut};
pub use question_source::QuestionSource;

pub use sessions::{
    AdvanceOutcome, AdvanceTicket, AnswerOutcome, AttemptStatus, BeginOutcome, CompletedAttempt,
    IgnoredAnswer, QuestionView, QuizDriver, QuizLoopService, QuizSession, SessionGeneration,
    SessionNotice, SessionPhase, SessionProgress, SessionSnapshot,
};

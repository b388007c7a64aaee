mod driver;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use driver::QuizDriver;
pub use progress::SessionProgress;
pub use service::{
    AdvanceOutcome, AdvanceTicket, AnswerOutcome, AttemptStatus, BeginOutcome, CompletedAttempt,
    IgnoredAnswer, QuizSession, SessionGeneration, SessionPhase,
};
pub use view::{QuestionView, SessionNotice, SessionSnapshot};
pub use workflow::QuizLoopService;

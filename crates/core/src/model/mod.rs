mod attempt;
mod ids;
mod question;
mod settings;

pub use ids::{AttemptId, ParseIdError, QuestionId, UserId};

pub use attempt::{AttemptError, AttemptRecord};
pub use question::{Question, QuestionError};
pub use settings::{QuizSettings, SettingsError};

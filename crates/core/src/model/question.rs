use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("a question needs at least two options, got {len}")]
    TooFewOptions { len: usize },

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single-answer multiple choice question.
///
/// Options keep the order they were stored in; answers refer to them by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if fewer than two options are given or `correct_index`
    /// does not point at an option. Text is taken as stored, blank or not.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    /// Binary check against the stored correct option. No partial credit.
    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn valid_question_keeps_option_order() {
        let q = Question::new(
            QuestionId::new(1),
            "Which fungus causes late blight?",
            opts(&["Phytophthora infestans", "Alternaria solani", "Fusarium"]),
            0,
        )
        .unwrap();

        assert_eq!(q.options()[1], "Alternaria solani");
        assert!(q.is_correct(0));
        assert!(!q.is_correct(2));
        assert!(q.has_option(2));
        assert!(!q.has_option(3));
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let err = Question::new(QuestionId::new(1), "A?", opts(&["x", "y"]), 2).unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn rejects_single_option() {
        let err = Question::new(QuestionId::new(1), "A?", opts(&["x"]), 0).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn blank_text_is_kept_as_stored() {
        let q = Question::new(QuestionId::new(1), "  ", opts(&["x", ""]), 1).unwrap();
        assert_eq!(q.prompt(), "  ");
        assert_eq!(q.options()[1], "");
        assert!(q.is_correct(1));
    }
}

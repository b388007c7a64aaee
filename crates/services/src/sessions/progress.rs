use serde::Serialize;

/// Running counts for the active playthrough.
///
/// `answered` includes a question whose answer is still being revealed, so
/// `score <= answered <= total` holds in every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Share of questions answered, rounded down. An empty session reports 0.
    #[must_use]
    pub fn percent_answered(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        u8::try_from(self.answered * 100 / self.total).unwrap_or(100)
    }
}

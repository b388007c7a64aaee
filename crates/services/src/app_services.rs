use std::sync::Arc;

use quiz_core::model::QuizSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::attempts::AttemptLedger;
use crate::identity::IdentityProvider;
use crate::sessions::{QuizDriver, QuizLoopService};

/// Assembles the quiz services on top of a storage backend.
#[derive(Clone)]
pub struct AppServices {
    ledger: AttemptLedger,
    quiz_loop: Arc<QuizLoopService>,
}

impl AppServices {
    #[must_use]
    pub fn new(
        storage: &Storage,
        clock: Clock,
        settings: QuizSettings,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let ledger = AttemptLedger::new(clock, Arc::clone(&storage.attempts));
        let quiz_loop = Arc::new(QuizLoopService::new(
            settings,
            identity,
            Arc::clone(&storage.questions),
            ledger.clone(),
        ));
        Self {
            ledger,
            quiz_loop,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> AttemptLedger {
        self.ledger.clone()
    }

    /// A fresh driver with its own session, sharing this app's stores.
    #[must_use]
    pub fn driver(&self) -> QuizDriver {
        QuizDriver::new(self.quiz_loop.as_ref().clone())
    }
}

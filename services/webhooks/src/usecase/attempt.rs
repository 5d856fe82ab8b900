use hookline_domain::id::{AccountId, EventId};

use crate::domain::repository::AttemptRepository;
use crate::domain::types::Attempt;
use crate::error::WebhooksServiceError;

// ── GetAttempts ──────────────────────────────────────────────────────────────

pub struct GetAttemptsUseCase<A: AttemptRepository> {
    pub repo: A,
}

impl<A: AttemptRepository> GetAttemptsUseCase<A> {
    /// Attempts of the account in `attempted_at` order, optionally for one event.
    pub async fn execute(
        &self,
        account_id: AccountId,
        event_id: Option<EventId>,
    ) -> Result<Vec<Attempt>, WebhooksServiceError> {
        self.repo.list_by_account(account_id, event_id).await
    }
}

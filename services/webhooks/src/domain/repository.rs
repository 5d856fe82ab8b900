#![allow(async_fn_in_trait)]

use std::future::Future;

use hookline_domain::id::{AccountId, EventId};

use crate::domain::types::{Attempt, DeliveryJob, DeliveryRequest, Event, Outcome, Registration};
use crate::error::WebhooksServiceError;

/// Repository for registrations (destination URLs per account).
pub trait RegistrationRepository: Send + Sync {
    async fn create(&self, registration: &Registration) -> Result<(), WebhooksServiceError>;

    /// All registrations of an account, oldest first.
    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Registration>, WebhooksServiceError>;
}

/// Repository for accepted events.
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<(), WebhooksServiceError>;

    /// All events of an account, oldest first.
    async fn list_by_account(&self, account_id: AccountId)
    -> Result<Vec<Event>, WebhooksServiceError>;
}

// The ports below are driven from spawned delivery workers, so their futures must be `Send`.

/// Append-only store of delivery attempts.
pub trait AttemptRepository: Send + Sync {
    fn create(
        &self,
        attempt: &Attempt,
    ) -> impl Future<Output = Result<(), WebhooksServiceError>> + Send;

    /// Attempts of an account ordered by `attempted_at`, optionally limited to one event.
    fn list_by_account(
        &self,
        account_id: AccountId,
        event_id: Option<EventId>,
    ) -> impl Future<Output = Result<Vec<Attempt>, WebhooksServiceError>> + Send;
}

/// Performs exactly one outbound call per invocation.
///
/// Network failures, timeouts and non-2xx answers come back as an unsuccessful
/// [`Outcome`]; only a malformed URL is an error.
pub trait DeliveryPort: Send + Sync {
    fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> impl Future<Output = Result<Outcome, WebhooksServiceError>> + Send;
}

/// Hands (event, registration) pairs to the delivery workers.
pub trait DeliveryScheduler: Send + Sync {
    async fn schedule(&self, job: DeliveryJob) -> Result<(), WebhooksServiceError>;
}

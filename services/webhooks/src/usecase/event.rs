use chrono::Utc;
use tracing::{error, info, warn};

use hookline_domain::id::{AccountId, EventId};

use crate::domain::repository::{DeliveryScheduler, EventRepository, RegistrationRepository};
use crate::domain::types::{DeliveryJob, Event};
use crate::error::WebhooksServiceError;

// ── RegisterEvent ────────────────────────────────────────────────────────────

#[derive(Debug, Default, serde::Deserialize)]
pub struct RegisterEventInput {
    pub payload: Option<String>,
}

/// Stores an event and schedules one delivery per registration of its account.
///
/// Returns as soon as the jobs are queued; deliveries run on the worker pool.
/// A queue that stays full drops the remaining jobs instead of holding the caller.
pub struct RegisterEventUseCase<E, R, S>
where
    E: EventRepository,
    R: RegistrationRepository,
    S: DeliveryScheduler,
{
    pub events: E,
    pub registrations: R,
    pub scheduler: S,
}

impl<E, R, S> RegisterEventUseCase<E, R, S>
where
    E: EventRepository,
    R: RegistrationRepository,
    S: DeliveryScheduler,
{
    pub async fn execute(
        &self,
        account_id: AccountId,
        input: RegisterEventInput,
    ) -> Result<Event, WebhooksServiceError> {
        let payload = input
            .payload
            .ok_or_else(|| WebhooksServiceError::MissingParams(vec!["payload"]))?;

        let event = Event {
            id: EventId::generate(),
            account_id,
            payload,
            created_at: Utc::now(),
        };
        self.events.create(&event).await?;

        // The event is accepted at this point; a failed lookup only means no fan-out.
        let registrations = match self.registrations.list_by_account(account_id).await {
            Ok(registrations) => registrations,
            Err(e) => {
                warn!(
                    %account_id,
                    event_id = %event.id,
                    error = ?e,
                    "registration lookup failed, event will not be delivered"
                );
                Vec::new()
            }
        };

        let fan_out = registrations.len();
        let mut registrations = registrations.into_iter();
        while let Some(registration) = registrations.next() {
            let registration_id = registration.id;
            let job = DeliveryJob {
                event: event.clone(),
                registration,
            };
            match self.scheduler.schedule(job).await {
                Ok(()) => {}
                // The queue stayed full for the whole wait; the rest would wait too.
                Err(WebhooksServiceError::QueueFull) => {
                    error!(
                        %account_id,
                        event_id = %event.id,
                        dropped = registrations.len() + 1,
                        "delivery queue full, dropping remaining deliveries"
                    );
                    break;
                }
                Err(e) => {
                    error!(
                        %account_id,
                        event_id = %event.id,
                        %registration_id,
                        error = ?e,
                        "failed to schedule delivery"
                    );
                }
            }
        }

        info!(%account_id, event_id = %event.id, fan_out, "event registered");
        Ok(event)
    }
}

// ── GetEvents ────────────────────────────────────────────────────────────────

pub struct GetEventsUseCase<E: EventRepository> {
    pub repo: E,
}

impl<E: EventRepository> GetEventsUseCase<E> {
    pub async fn execute(&self, account_id: AccountId) -> Result<Vec<Event>, WebhooksServiceError> {
        self.repo.list_by_account(account_id).await
    }
}

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use hookline_domain::id::{AccountId, AttemptId, EventId, RegistrationId};

use crate::domain::repository::AttemptRepository;
use crate::domain::types::{Attempt, Outcome};
use crate::error::WebhooksServiceError;

/// Bounded retry for attempt writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPolicy {
    /// Total write tries, first one included.
    pub max_writes: u32,
    /// Delay after the first failed write; doubles after each further failure.
    pub backoff: Duration,
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self {
            max_writes: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Identifies which delivery an outcome belongs to.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    pub account_id: AccountId,
    pub event_id: EventId,
    pub registration_id: RegistrationId,
    pub destination_url: String,
    pub attempt_number: u32,
}

/// Turns outcomes into persisted attempts.
///
/// The delivery already happened when this runs, so a store outage never stalls
/// the pipeline: writes are retried a few times, then the attempt is logged and dropped.
/// Once shutdown is signalled no further write is tried.
pub struct AttemptRecorder<A: AttemptRepository> {
    pub repo: A,
    pub policy: RecordPolicy,
}

impl<A: AttemptRepository> AttemptRecorder<A> {
    pub fn new(repo: A, policy: RecordPolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn record(
        &self,
        context: &AttemptContext,
        outcome: &Outcome,
        cancel: &CancellationToken,
    ) -> Result<Attempt, WebhooksServiceError> {
        let attempt = Attempt {
            id: AttemptId::generate(),
            account_id: context.account_id,
            event_id: context.event_id,
            registration_id: context.registration_id,
            destination_url: context.destination_url.clone(),
            attempt_number: context.attempt_number,
            outcome: outcome.outcome(),
            http_status: outcome.http_status,
            error_message: outcome.error_message.clone(),
            response_body: outcome.response_body.clone(),
            duration: outcome.duration,
            attempted_at: outcome.attempted_at,
        };

        let max_writes = self.policy.max_writes.max(1);
        let mut backoff = self.policy.backoff;
        let mut write = 1;
        let error = loop {
            let e = match self.repo.create(&attempt).await {
                Ok(()) => return Ok(attempt),
                Err(e) => e,
            };
            if write >= max_writes || cancel.is_cancelled() {
                break e;
            }
            warn!(
                attempt_id = %attempt.id,
                event_id = %attempt.event_id,
                write,
                error = ?e,
                "attempt write failed, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => break e,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = backoff.saturating_mul(2);
            write += 1;
        };

        error!(
            attempt_id = %attempt.id,
            account_id = %attempt.account_id,
            event_id = %attempt.event_id,
            registration_id = %attempt.registration_id,
            attempt = attempt.attempt_number,
            outcome = %attempt.outcome,
            write,
            shutdown = cancel.is_cancelled(),
            error = ?error,
            "dropping attempt after failed writes"
        );
        Err(error)
    }
}

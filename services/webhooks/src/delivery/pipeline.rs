//! Per-(event, registration) delivery state machine.
//!
//! `Pending → Attempting → {Delivered, Exhausted}`; every attempt writes exactly
//! one attempt row, success or failure. Shutdown while waiting out a backoff ends
//! the pipeline as `Interrupted` without abandoning a call in flight.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::delivery::recorder::{AttemptContext, AttemptRecorder};
use crate::delivery::retry::{RetryDecision, RetryPolicy};
use crate::domain::repository::{AttemptRepository, DeliveryPort};
use crate::domain::types::{
    ATTEMPT_HEADER, DeliveryJob, DeliveryRequest, EVENT_ID_HEADER, Outcome,
    REGISTRATION_ID_HEADER,
};
use crate::error::WebhooksServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Attempting { attempt: u32 },
    Delivered { attempts: u32 },
    Exhausted { attempts: u32 },
    /// Shutdown arrived between attempts; remaining retries were skipped.
    Interrupted { attempts: u32 },
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Delivered { .. } | Self::Exhausted { .. } | Self::Interrupted { .. }
        )
    }
}

pub struct DeliveryPipeline<D: DeliveryPort, A: AttemptRepository> {
    pub delivery: D,
    pub recorder: AttemptRecorder<A>,
    pub retry: RetryPolicy,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl<D: DeliveryPort, A: AttemptRepository> DeliveryPipeline<D, A> {
    /// Drive one pair to a terminal state.
    pub async fn run(&self, job: &DeliveryJob, cancel: &CancellationToken) -> DeliveryState {
        let span = info_span!(
            "delivery_pipeline",
            account_id = %job.event.account_id,
            event_id = %job.event.id,
            registration_id = %job.registration.id,
        );

        async move {
            let mut state = DeliveryState::Pending;
            let mut last_attempted_at = None;
            while !state.is_terminal() {
                state = match state {
                    DeliveryState::Pending => DeliveryState::Attempting { attempt: 1 },
                    DeliveryState::Attempting { attempt } => {
                        self.attempt(job, attempt, &mut last_attempted_at, cancel)
                            .await
                    }
                    terminal => terminal,
                };
            }
            state
        }
        .instrument(span)
        .await
    }

    async fn attempt(
        &self,
        job: &DeliveryJob,
        attempt: u32,
        last_attempted_at: &mut Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> DeliveryState {
        let request = DeliveryRequest::new(
            job.registration.url.as_str(),
            job.event.payload.as_str(),
            self.timeout,
        )
        .header(EVENT_ID_HEADER, job.event.id.to_string())
        .header(REGISTRATION_ID_HEADER, job.registration.id.to_string())
        .header(ATTEMPT_HEADER, attempt.to_string());

        let (mut outcome, retryable) = match self.delivery.deliver(&request).await {
            Ok(outcome) => (outcome, true),
            // Only a malformed stored URL lands here; retrying cannot fix it.
            Err(e) => (rejected_outcome(&e), false),
        };

        // Attempts of one pair never go back in time, even if the wall clock does.
        if let Some(previous) = *last_attempted_at {
            outcome.attempted_at = outcome.attempted_at.max(previous);
        }
        *last_attempted_at = Some(outcome.attempted_at);

        let context = AttemptContext {
            account_id: job.event.account_id,
            event_id: job.event.id,
            registration_id: job.registration.id,
            destination_url: job.registration.url.clone(),
            attempt_number: attempt,
        };
        // A dropped attempt is already logged by the recorder; delivery carries on.
        let _ = self.recorder.record(&context, &outcome, cancel).await;

        if outcome.success {
            info!(attempt, status = ?outcome.http_status, "event delivered");
            return DeliveryState::Delivered { attempts: attempt };
        }

        let decision = if retryable {
            self.retry.decide(attempt)
        } else {
            RetryDecision::GiveUp
        };
        match decision {
            RetryDecision::GiveUp => {
                warn!(
                    attempt,
                    status = ?outcome.http_status,
                    error = outcome.error_message.as_deref().unwrap_or_default(),
                    "delivery exhausted"
                );
                DeliveryState::Exhausted { attempts: attempt }
            }
            RetryDecision::Retry { delay } => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "delivery failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(attempt, "shutdown during backoff, skipping remaining retries");
                        DeliveryState::Interrupted { attempts: attempt }
                    }
                    _ = tokio::time::sleep(delay) => DeliveryState::Attempting { attempt: attempt + 1 },
                }
            }
        }
    }
}

fn rejected_outcome(error: &WebhooksServiceError) -> Outcome {
    Outcome {
        success: false,
        http_status: None,
        error_message: Some(error.to_string()),
        response_body: None,
        duration: Duration::ZERO,
        attempted_at: Utc::now(),
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use hookline_domain::id::{AccountId, AttemptId, EventId, RegistrationId};
use hookline_domain::outcome::DeliveryOutcome;

use crate::error::WebhooksServiceError;

/// Standing subscription: deliver this account's events to `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: RegistrationId,
    pub account_id: AccountId,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A fact belonging to an account that must be delivered to all its registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub account_id: AccountId,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one delivery try for an (event, registration) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub id: AttemptId,
    pub account_id: AccountId,
    pub event_id: EventId,
    pub registration_id: RegistrationId,
    pub destination_url: String,
    /// 1-based position within the pair's delivery pipeline.
    pub attempt_number: u32,
    pub outcome: DeliveryOutcome,
    pub http_status: Option<u16>,
    pub error_message: Option<String>,
    pub response_body: Option<String>,
    pub duration: Duration,
    pub attempted_at: DateTime<Utc>,
}

/// In-memory result of a single delivery call, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// True iff the destination answered with a 2xx status.
    pub success: bool,
    pub http_status: Option<u16>,
    /// Set on connection failure, timeout or non-2xx status.
    pub error_message: Option<String>,
    pub response_body: Option<String>,
    pub duration: Duration,
    pub attempted_at: DateTime<Utc>,
}

impl Outcome {
    pub fn outcome(&self) -> DeliveryOutcome {
        DeliveryOutcome::from_success(self.success)
    }
}

/// Result of an ad hoc connectivity test. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub outcome: DeliveryOutcome,
    pub http_status: Option<u16>,
    pub error_message: Option<String>,
    pub duration: Duration,
}

impl From<Outcome> for TestResult {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome: outcome.outcome(),
            http_status: outcome.http_status,
            error_message: outcome.error_message,
            duration: outcome.duration,
        }
    }
}

/// One outbound call: where, what, and how long to wait.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub url: String,
    pub payload: String,
    pub timeout: Duration,
    /// Extra headers identifying the delivery to the destination.
    pub headers: Vec<(&'static str, String)>,
}

impl DeliveryRequest {
    pub fn new(url: impl Into<String>, payload: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            payload: payload.into(),
            timeout,
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Work item consumed by the delivery workers: one (event, registration) pair.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub event: Event,
    pub registration: Registration,
}

pub const EVENT_ID_HEADER: &str = "x-hookline-event-id";
pub const REGISTRATION_ID_HEADER: &str = "x-hookline-registration-id";
pub const ATTEMPT_HEADER: &str = "x-hookline-attempt";

/// Parse a destination URL. Only absolute `http`/`https` URLs with a host are accepted.
pub fn parse_destination_url(raw: &str) -> Result<Url, WebhooksServiceError> {
    let url = Url::parse(raw.trim()).map_err(|e| WebhooksServiceError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WebhooksServiceError::InvalidUrl(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(WebhooksServiceError::InvalidUrl("missing host".to_owned()));
    }
    Ok(url)
}

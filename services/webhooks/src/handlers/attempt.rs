use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hookline_domain::id::{AccountId, AttemptId, EventId, RegistrationId};
use hookline_domain::outcome::DeliveryOutcome;

use crate::domain::types::Attempt;
use crate::error::WebhooksServiceError;
use crate::handlers::AccountPath;
use crate::state::AppState;
use crate::usecase::attempt::GetAttemptsUseCase;

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AttemptResponse {
    pub id: AttemptId,
    pub account_id: AccountId,
    pub event_id: EventId,
    pub registration_id: RegistrationId,
    pub destination_url: String,
    pub attempt_number: u32,
    pub outcome: DeliveryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(serialize_with = "hookline_core::serde::to_millis")]
    pub duration: Duration,
    #[serde(serialize_with = "hookline_core::serde::to_rfc3339_ms")]
    pub attempted_at: DateTime<Utc>,
}

impl From<Attempt> for AttemptResponse {
    fn from(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            account_id: attempt.account_id,
            event_id: attempt.event_id,
            registration_id: attempt.registration_id,
            destination_url: attempt.destination_url,
            attempt_number: attempt.attempt_number,
            outcome: attempt.outcome,
            http_status: attempt.http_status,
            error_message: attempt.error_message,
            response_body: attempt.response_body,
            duration: attempt.duration,
            attempted_at: attempt.attempted_at,
        }
    }
}

// ── Query params ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct AttemptListQuery {
    pub event_id: Option<EventId>,
}

// ── GET /accounts/{account_id}/attempts ──────────────────────────────────────

pub async fn get_attempts(
    AccountPath(account_id): AccountPath,
    State(state): State<AppState>,
    query: Result<Query<AttemptListQuery>, QueryRejection>,
) -> Result<Json<Vec<AttemptResponse>>, WebhooksServiceError> {
    let Query(query) = query.map_err(|_| WebhooksServiceError::InvalidQuery("event_id"))?;
    let usecase = GetAttemptsUseCase {
        repo: state.attempt_repo(),
    };
    let attempts = usecase.execute(account_id, query.event_id).await?;
    Ok(Json(attempts.into_iter().map(Into::into).collect()))
}

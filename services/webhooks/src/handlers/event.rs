use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use hookline_domain::id::{AccountId, EventId};

use crate::domain::types::Event;
use crate::error::WebhooksServiceError;
use crate::handlers::{AccountPath, JsonBody};
use crate::state::AppState;
use crate::usecase::event::{GetEventsUseCase, RegisterEventInput, RegisterEventUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventResponse {
    pub id: EventId,
    pub account_id: AccountId,
    pub payload: String,
    #[serde(serialize_with = "hookline_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            account_id: event.account_id,
            payload: event.payload,
            created_at: event.created_at,
        }
    }
}

// ── GET /accounts/{account_id}/events ────────────────────────────────────────

pub async fn get_events(
    AccountPath(account_id): AccountPath,
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, WebhooksServiceError> {
    let usecase = GetEventsUseCase {
        repo: state.event_repo(),
    };
    let events = usecase.execute(account_id).await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

// ── POST /accounts/{account_id}/events ───────────────────────────────────────

/// The account comes from the path; any `account_id` in the body is ignored.
pub async fn create_event(
    AccountPath(account_id): AccountPath,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterEventInput>,
) -> Result<(StatusCode, Json<EventResponse>), WebhooksServiceError> {
    let usecase = RegisterEventUseCase {
        events: state.event_repo(),
        registrations: state.registration_repo(),
        scheduler: state.queue.clone(),
    };
    let event = usecase.execute(account_id, input).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

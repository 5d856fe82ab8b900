use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use hookline_domain::id::{AccountId, RegistrationId};

use crate::domain::types::Registration;
use crate::error::WebhooksServiceError;
use crate::handlers::{AccountPath, JsonBody};
use crate::state::AppState;
use crate::usecase::registration::{
    CreateRegistrationInput, CreateRegistrationUseCase, GetRegistrationsUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RegistrationResponse {
    pub id: RegistrationId,
    pub account_id: AccountId,
    pub url: String,
    #[serde(serialize_with = "hookline_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationResponse {
    fn from(registration: Registration) -> Self {
        Self {
            id: registration.id,
            account_id: registration.account_id,
            url: registration.url,
            created_at: registration.created_at,
        }
    }
}

// ── GET /accounts/{account_id}/registrations ─────────────────────────────────

pub async fn get_registrations(
    AccountPath(account_id): AccountPath,
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationResponse>>, WebhooksServiceError> {
    let usecase = GetRegistrationsUseCase {
        repo: state.registration_repo(),
    };
    let registrations = usecase.execute(account_id).await?;
    Ok(Json(registrations.into_iter().map(Into::into).collect()))
}

// ── POST /accounts/{account_id}/registrations ────────────────────────────────

pub async fn create_registration(
    AccountPath(account_id): AccountPath,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateRegistrationInput>,
) -> Result<(StatusCode, Json<RegistrationResponse>), WebhooksServiceError> {
    let usecase = CreateRegistrationUseCase {
        repo: state.registration_repo(),
    };
    let registration = usecase.execute(account_id, input).await?;
    Ok((StatusCode::CREATED, Json(registration.into())))
}

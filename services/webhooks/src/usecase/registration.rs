use chrono::Utc;
use tracing::info;

use hookline_domain::id::{AccountId, RegistrationId};

use crate::domain::repository::RegistrationRepository;
use crate::domain::types::{Registration, parse_destination_url};
use crate::error::WebhooksServiceError;

// ── CreateRegistration ───────────────────────────────────────────────────────

#[derive(Debug, Default, serde::Deserialize)]
pub struct CreateRegistrationInput {
    pub url: Option<String>,
}

pub struct CreateRegistrationUseCase<R: RegistrationRepository> {
    pub repo: R,
}

impl<R: RegistrationRepository> CreateRegistrationUseCase<R> {
    pub async fn execute(
        &self,
        account_id: AccountId,
        input: CreateRegistrationInput,
    ) -> Result<Registration, WebhooksServiceError> {
        let url = input
            .url
            .ok_or_else(|| WebhooksServiceError::MissingParams(vec!["url"]))?;
        let url = parse_destination_url(&url)?;

        let registration = Registration {
            id: RegistrationId::generate(),
            account_id,
            url: url.into(),
            created_at: Utc::now(),
        };
        self.repo.create(&registration).await?;
        info!(%account_id, registration_id = %registration.id, "registration created");
        Ok(registration)
    }
}

// ── GetRegistrations ─────────────────────────────────────────────────────────

pub struct GetRegistrationsUseCase<R: RegistrationRepository> {
    pub repo: R,
}

impl<R: RegistrationRepository> GetRegistrationsUseCase<R> {
    pub async fn execute(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Registration>, WebhooksServiceError> {
        self.repo.list_by_account(account_id).await
    }
}

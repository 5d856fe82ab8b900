use std::time::Duration;

use anyhow::Context as _;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

use hookline_domain::id::{AccountId, EventId};
use hookline_webhooks_schema::{attempts, events, registrations};

use crate::domain::repository::{AttemptRepository, EventRepository, RegistrationRepository};
use crate::domain::types::{Attempt, Event, Registration};
use crate::error::WebhooksServiceError;

// ── Registration repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRegistrationRepository {
    pub db: DatabaseConnection,
}

impl RegistrationRepository for DbRegistrationRepository {
    async fn create(&self, registration: &Registration) -> Result<(), WebhooksServiceError> {
        registrations::ActiveModel {
            id: Set(registration.id.0),
            account_id: Set(registration.account_id.0),
            url: Set(registration.url.clone()),
            created_at: Set(registration.created_at),
        }
        .insert(&self.db)
        .await
        .context("create registration")?;
        Ok(())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Registration>, WebhooksServiceError> {
        let models = registrations::Entity::find()
            .filter(registrations::Column::AccountId.eq(account_id.0))
            .order_by_asc(registrations::Column::CreatedAt)
            .order_by_asc(registrations::Column::Id)
            .all(&self.db)
            .await
            .context("list registrations by account")?;
        Ok(models.into_iter().map(registration_from_model).collect())
    }
}

fn registration_from_model(model: registrations::Model) -> Registration {
    Registration {
        id: model.id.into(),
        account_id: model.account_id.into(),
        url: model.url,
        created_at: model.created_at,
    }
}

// ── Event repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventRepository {
    pub db: DatabaseConnection,
}

impl EventRepository for DbEventRepository {
    async fn create(&self, event: &Event) -> Result<(), WebhooksServiceError> {
        events::ActiveModel {
            id: Set(event.id.0),
            account_id: Set(event.account_id.0),
            payload: Set(event.payload.clone()),
            created_at: Set(event.created_at),
        }
        .insert(&self.db)
        .await
        .context("create event")?;
        Ok(())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Event>, WebhooksServiceError> {
        let models = events::Entity::find()
            .filter(events::Column::AccountId.eq(account_id.0))
            .order_by_asc(events::Column::CreatedAt)
            .order_by_asc(events::Column::Id)
            .all(&self.db)
            .await
            .context("list events by account")?;
        Ok(models.into_iter().map(event_from_model).collect())
    }
}

fn event_from_model(model: events::Model) -> Event {
    Event {
        id: model.id.into(),
        account_id: model.account_id.into(),
        payload: model.payload,
        created_at: model.created_at,
    }
}

// ── Attempt repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAttemptRepository {
    pub db: DatabaseConnection,
}

impl AttemptRepository for DbAttemptRepository {
    async fn create(&self, attempt: &Attempt) -> Result<(), WebhooksServiceError> {
        attempts::ActiveModel {
            id: Set(attempt.id.0),
            account_id: Set(attempt.account_id.0),
            event_id: Set(attempt.event_id.0),
            registration_id: Set(attempt.registration_id.0),
            destination_url: Set(attempt.destination_url.clone()),
            attempt_number: Set(i32::try_from(attempt.attempt_number).unwrap_or(i32::MAX)),
            outcome: Set(attempt.outcome.as_str().to_owned()),
            http_status: Set(attempt.http_status.map(i32::from)),
            error_message: Set(attempt.error_message.clone()),
            response_body: Set(attempt.response_body.clone()),
            duration_ms: Set(i64::try_from(attempt.duration.as_millis()).unwrap_or(i64::MAX)),
            attempted_at: Set(attempt.attempted_at),
        }
        .insert(&self.db)
        .await
        .context("create attempt")?;
        Ok(())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        event_id: Option<EventId>,
    ) -> Result<Vec<Attempt>, WebhooksServiceError> {
        let mut query = attempts::Entity::find().filter(attempts::Column::AccountId.eq(account_id.0));
        if let Some(event_id) = event_id {
            query = query.filter(attempts::Column::EventId.eq(event_id.0));
        }
        let models = query
            .order_by_asc(attempts::Column::AttemptedAt)
            .order_by_asc(attempts::Column::Id)
            .all(&self.db)
            .await
            .context("list attempts by account")?;
        models
            .into_iter()
            .map(attempt_from_model)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(WebhooksServiceError::from)
    }
}

fn attempt_from_model(model: attempts::Model) -> anyhow::Result<Attempt> {
    let outcome = model
        .outcome
        .parse()
        .with_context(|| format!("attempt {} has unknown outcome", model.id))?;
    Ok(Attempt {
        id: model.id.into(),
        account_id: model.account_id.into(),
        event_id: model.event_id.into(),
        registration_id: model.registration_id.into(),
        destination_url: model.destination_url,
        attempt_number: u32::try_from(model.attempt_number).unwrap_or_default(),
        outcome,
        http_status: model.http_status.and_then(|s| u16::try_from(s).ok()),
        error_message: model.error_message,
        response_body: model.response_body,
        duration: Duration::from_millis(u64::try_from(model.duration_ms).unwrap_or_default()),
        attempted_at: model.attempted_at,
    })
}

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::WebhooksConfig;
use crate::delivery::queue::DeliveryQueue;
use crate::infra::db::{DbAttemptRepository, DbEventRepository, DbRegistrationRepository};
use crate::infra::delivery::HttpDeliveryClient;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub delivery_client: HttpDeliveryClient,
    /// Sending half of the queue drained by the delivery workers.
    pub queue: DeliveryQueue,
    pub config: Arc<WebhooksConfig>,
}

impl AppState {
    pub fn registration_repo(&self) -> DbRegistrationRepository {
        DbRegistrationRepository {
            db: self.db.clone(),
        }
    }

    pub fn event_repo(&self) -> DbEventRepository {
        DbEventRepository {
            db: self.db.clone(),
        }
    }

    pub fn attempt_repo(&self) -> DbAttemptRepository {
        DbAttemptRepository {
            db: self.db.clone(),
        }
    }
}

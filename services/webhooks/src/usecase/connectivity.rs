use std::time::Duration;

use tracing::info;

use crate::domain::repository::DeliveryPort;
use crate::domain::types::{DeliveryRequest, TestResult};
use crate::error::WebhooksServiceError;

// ── TestConnectivity ─────────────────────────────────────────────────────────

/// Body of a connectivity test. Both fields are required; presence is checked
/// by [`TestConnectivityInput::validate`] so every missing name is reported.
#[derive(Debug, Default, serde::Deserialize)]
pub struct TestConnectivityInput {
    pub url: Option<String>,
    pub data: Option<String>,
}

impl TestConnectivityInput {
    /// Returns `(url, data)` or the list of absent fields.
    pub fn validate(self) -> Result<(String, String), WebhooksServiceError> {
        match (self.url, self.data) {
            (Some(url), Some(data)) => Ok((url, data)),
            (url, data) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("url");
                }
                if data.is_none() {
                    missing.push("data");
                }
                Err(WebhooksServiceError::MissingParams(missing))
            }
        }
    }
}

/// One synchronous delivery, nothing stored.
pub struct TestConnectivityUseCase<D: DeliveryPort> {
    pub delivery: D,
    pub timeout: Duration,
}

impl<D: DeliveryPort> TestConnectivityUseCase<D> {
    pub async fn execute(
        &self,
        input: TestConnectivityInput,
    ) -> Result<TestResult, WebhooksServiceError> {
        let (url, data) = input.validate()?;
        let outcome = self
            .delivery
            .deliver(&DeliveryRequest::new(url, data, self.timeout))
            .await?;
        info!(
            success = outcome.success,
            status = ?outcome.http_status,
            duration_ms = outcome.duration.as_millis() as u64,
            "connectivity test finished"
        );
        Ok(outcome.into())
    }
}

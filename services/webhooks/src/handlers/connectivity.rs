use std::time::Duration;

use axum::{Json, extract::State};
use serde::Serialize;

use hookline_domain::outcome::DeliveryOutcome;

use crate::domain::types::TestResult;
use crate::error::WebhooksServiceError;
use crate::handlers::{AccountPath, JsonBody};
use crate::state::AppState;
use crate::usecase::connectivity::{TestConnectivityInput, TestConnectivityUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TestResultResponse {
    pub outcome: DeliveryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(serialize_with = "hookline_core::serde::to_millis")]
    pub duration: Duration,
}

impl From<TestResult> for TestResultResponse {
    fn from(result: TestResult) -> Self {
        Self {
            outcome: result.outcome,
            http_status: result.http_status,
            error_message: result.error_message,
            duration: result.duration,
        }
    }
}

// ── POST /accounts/{account_id}/test ─────────────────────────────────────────

/// Always 200 once the call was made, whatever the destination did.
pub async fn test_connectivity(
    AccountPath(account_id): AccountPath,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<TestConnectivityInput>,
) -> Result<Json<TestResultResponse>, WebhooksServiceError> {
    tracing::debug!(%account_id, "connectivity test requested");
    let usecase = TestConnectivityUseCase {
        delivery: state.delivery_client.clone(),
        timeout: state.config.test_timeout(),
    };
    let result = usecase.execute(input).await?;
    Ok(Json(result.into()))
}

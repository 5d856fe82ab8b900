pub mod attempt;
pub mod connectivity;
pub mod event;
pub mod health;
pub mod registration;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

use hookline_domain::id::AccountId;

use crate::error::WebhooksServiceError;

/// `{account_id}` path segment. Anything but a plain decimal number is treated
/// as an unmatched route.
#[derive(Debug, Clone, Copy)]
pub struct AccountPath(pub AccountId);

impl<S: Send + Sync> FromRequestParts<S> for AccountPath {
    type Rejection = WebhooksServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| WebhooksServiceError::RouteNotFound)?;
        raw.parse()
            .map(Self)
            .map_err(|_| WebhooksServiceError::RouteNotFound)
    }
}

/// JSON object request body, decoded regardless of the `content-type` header.
///
/// An absent, non-JSON, non-object or ill-typed body is rejected as `InvalidBody`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebhooksServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            debug!(error = %e, "failed to read request body");
            WebhooksServiceError::InvalidBody
        })?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "rejected request body");
            WebhooksServiceError::InvalidBody
        })?;
        if !value.is_object() {
            debug!("rejected request body: not a JSON object");
            return Err(WebhooksServiceError::InvalidBody);
        }
        serde_json::from_value(value).map(Self).map_err(|e| {
            debug!(error = %e, "rejected request body");
            WebhooksServiceError::InvalidBody
        })
    }
}

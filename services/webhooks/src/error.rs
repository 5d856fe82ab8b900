use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Webhooks service error variants.
///
/// Delivery failures are not errors: they travel as `Outcome`/`Attempt` data.
#[derive(Debug, thiserror::Error)]
pub enum WebhooksServiceError {
    #[error("missing required params: {}", .0.join(", "))]
    MissingParams(Vec<&'static str>),
    #[error("invalid request body")]
    InvalidBody,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid query parameter: {0}")]
    InvalidQuery(&'static str),
    #[error("not found")]
    RouteNotFound,
    #[error("delivery queue is full")]
    QueueFull,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl WebhooksServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParams(_) => "MISSING_PARAMS",
            Self::InvalidBody => "INVALID_BODY",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::RouteNotFound => "NOT_FOUND",
            Self::QueueFull => "QUEUE_FULL",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for WebhooksServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingParams(_)
            | Self::InvalidBody
            | Self::InvalidUrl(_)
            | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

use std::fmt::Display;

use axum::http::StatusCode;

/// Handler for `GET /healthz`: liveness check, answers as long as the process serves HTTP.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map the result of a dependency probe (database ping, etc.) to a readiness status.
pub fn readiness<E: Display>(dependency: &str, probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(dependency, error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

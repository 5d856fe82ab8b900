use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use hookline_core::error::{method_not_allowed, route_not_found};
use hookline_core::health::healthz;
use hookline_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    attempt::get_attempts,
    connectivity::test_connectivity,
    event::{create_event, get_events},
    health::readyz,
    registration::{create_registration, get_registrations},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Connectivity test
        .route("/accounts/{account_id}/test", post(test_connectivity))
        // Registrations
        .route(
            "/accounts/{account_id}/registrations",
            get(get_registrations).post(create_registration),
        )
        // Events
        .route(
            "/accounts/{account_id}/events",
            get(get_events).post(create_event),
        )
        // Attempts
        .route("/accounts/{account_id}/attempts", get(get_attempts))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}

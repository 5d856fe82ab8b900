use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use hookline_core::config::Config;
use hookline_testing::{TestDestination, unreachable_url};
use hookline_webhooks::config::WebhooksConfig;
use hookline_webhooks::delivery::pipeline::DeliveryPipeline;
use hookline_webhooks::delivery::queue::{DeliveryQueue, DeliveryWorkerPool};
use hookline_webhooks::delivery::recorder::AttemptRecorder;
use hookline_webhooks::domain::types::EVENT_ID_HEADER;
use hookline_webhooks::infra::db::DbAttemptRepository;
use hookline_webhooks::infra::delivery::HttpDeliveryClient;
use hookline_webhooks::router::build_router;
use hookline_webhooks::state::AppState;
use hookline_webhooks_migration::Migrator;

use crate::helpers::fast_retry;

struct TestApp {
    server: TestServer,
    db: DatabaseConnection,
    workers: DeliveryWorkerPool,
}

impl TestApp {
    async fn spawn() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let config = WebhooksConfig::from_vars([
            ("DATABASE_URL", "sqlite::memory:"),
            ("TEST_TIMEOUT_MS", "2000"),
            ("DELIVERY_TIMEOUT_MS", "2000"),
        ])
        .unwrap();

        let delivery_client = HttpDeliveryClient::new().unwrap();
        let pipeline = Arc::new(DeliveryPipeline {
            delivery: delivery_client.clone(),
            recorder: AttemptRecorder::new(
                DbAttemptRepository { db: db.clone() },
                config.record_policy(),
            ),
            retry: fast_retry(3),
            timeout: config.delivery_timeout(),
        });
        let (queue, receiver) = DeliveryQueue::bounded(16, Duration::from_secs(1));
        let workers = DeliveryWorkerPool::spawn(pipeline, receiver, 4, CancellationToken::new());

        let state = AppState {
            db: db.clone(),
            delivery_client,
            queue,
            config: Arc::new(config),
        };
        let server = TestServer::new(build_router(state)).unwrap();

        Self {
            server,
            db,
            workers,
        }
    }

    async fn register(&self, account_id: i64, url: &str) -> Value {
        let response = self
            .server
            .post(&format!("/accounts/{account_id}/registrations"))
            .json(&json!({ "url": url }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn attempts(&self, path: &str) -> Vec<Value> {
        let response = self.server.get(path).await;
        response.assert_status_ok();
        response.json()
    }

    /// Poll the attempts listing until it holds at least `count` entries.
    async fn wait_for_attempts(&self, path: &str, count: usize) -> Vec<Value> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let attempts = self.attempts(path).await;
            if attempts.len() >= count || Instant::now() > deadline {
                return attempts;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn shutdown(self) {
        self.workers
            .shutdown_graceful(Duration::from_secs(5))
            .await
            .unwrap();
    }
}

// ── Connectivity test ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_return_200_failure_for_closed_port() {
    let app = TestApp::spawn().await;

    let response = app
        .server
        .post("/accounts/5/test")
        .json(&json!({ "url": unreachable_url(), "data": "x" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"], "failure");
    assert!(body["error_message"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(body.get("http_status").is_none());
    assert!(body["duration"].is_u64());

    // Tests are never persisted.
    assert!(app.attempts("/accounts/5/attempts").await.is_empty());
    app.shutdown().await;
}

#[tokio::test]
async fn should_return_200_success_for_reachable_destination() {
    let app = TestApp::spawn().await;
    let destination = TestDestination::ok().await;

    let response = app
        .server
        .post("/accounts/5/test")
        .json(&json!({ "url": destination.url(), "data": "{\"ping\":true}" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"], "success");
    assert_eq!(body["http_status"], 200);
    assert_eq!(destination.received()[0].body, "{\"ping\":true}");
    app.shutdown().await;
}

#[tokio::test]
async fn should_list_missing_test_params() {
    let app = TestApp::spawn().await;

    let response = app.server.post("/accounts/5/test").json(&json!({})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "MISSING_PARAMS");
    assert_eq!(body["message"], "missing required params: url, data");
    app.shutdown().await;
}

#[tokio::test]
async fn should_reject_test_without_body() {
    let app = TestApp::spawn().await;

    let response = app.server.post("/accounts/5/test").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INVALID_BODY");
    app.shutdown().await;
}

#[tokio::test]
async fn should_reject_test_with_non_string_data() {
    let app = TestApp::spawn().await;

    let response = app
        .server
        .post("/accounts/5/test")
        .json(&json!({ "url": "http://example.com", "data": 42 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    app.shutdown().await;
}

#[tokio::test]
async fn should_reject_test_with_array_body() {
    let app = TestApp::spawn().await;

    let response = app
        .server
        .post("/accounts/5/test")
        .json(&json!(["http://example.com", "ping"]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INVALID_BODY");
    app.shutdown().await;
}

// ── Registrations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_registration_without_body() {
    let app = TestApp::spawn().await;

    let response = app.server.post("/accounts/5/registrations").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    app.shutdown().await;
}

#[tokio::test]
async fn should_reject_registration_with_invalid_url() {
    let app = TestApp::spawn().await;

    let response = app
        .server
        .post("/accounts/5/registrations")
        .json(&json!({ "url": "not a url" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INVALID_URL");
    app.shutdown().await;
}

#[tokio::test]
async fn should_create_and_list_registrations_per_account() {
    let app = TestApp::spawn().await;

    let created = app.register(5, "http://example.com/hook").await;
    app.register(5, "https://example.org/other").await;
    app.register(6, "http://example.com/elsewhere").await;

    assert_eq!(created["account_id"], 5);
    assert_eq!(created["url"], "http://example.com/hook");
    assert!(created["id"].is_string());
    assert!(created["created_at"].as_str().unwrap().ends_with('Z'));

    let response = app.server.get("/accounts/5/registrations").await;
    response.assert_status_ok();
    let listed: Vec<Value> = response.json();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], created["id"]);
    app.shutdown().await;
}

// ── Events and attempts ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_return_empty_attempts_for_fresh_account() {
    let app = TestApp::spawn().await;

    let response = app.server.get("/accounts/5/attempts").await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
    app.shutdown().await;
}

#[tokio::test]
async fn should_store_event_without_registrations() {
    let app = TestApp::spawn().await;

    let response = app
        .server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "hello", "account_id": 99 }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let event: Value = response.json();
    assert_eq!(event["account_id"], 5);
    assert_eq!(event["payload"], "hello");

    let events: Vec<Value> = app.server.get("/accounts/5/events").await.json();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["id"], event["id"]);
    assert!(app.attempts("/accounts/5/attempts").await.is_empty());
    app.shutdown().await;
}

#[tokio::test]
async fn should_fan_out_event_to_every_registration() {
    let app = TestApp::spawn().await;
    let first = TestDestination::ok().await;
    let second = TestDestination::ok().await;
    let first_registration = app.register(5, &first.url()).await;
    let second_registration = app.register(5, &second.url()).await;

    let response = app
        .server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "hello" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let event: Value = response.json();
    let event_id = event["id"].as_str().unwrap().to_owned();

    let attempts = app.wait_for_attempts("/accounts/5/attempts", 2).await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a["outcome"] == "success"));
    assert!(attempts.iter().all(|a| a["event_id"] == event["id"]));
    assert!(attempts.iter().all(|a| a["attempt_number"] == 1));
    let mut registration_ids: Vec<_> = attempts
        .iter()
        .map(|a| a["registration_id"].as_str().unwrap().to_owned())
        .collect();
    registration_ids.sort();
    let mut expected = vec![
        first_registration["id"].as_str().unwrap().to_owned(),
        second_registration["id"].as_str().unwrap().to_owned(),
    ];
    expected.sort();
    assert_eq!(registration_ids, expected);

    assert_eq!(first.received()[0].body, "hello");
    assert_eq!(first.received()[0].header(EVENT_ID_HEADER), Some(event_id.as_str()));
    assert_eq!(second.hits(), 1);
    app.shutdown().await;
}

#[tokio::test]
async fn should_record_retries_in_order() {
    let app = TestApp::spawn().await;
    let destination = TestDestination::responding([500, 502, 200]).await;
    app.register(5, &destination.url()).await;

    app.server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "retry me" }))
        .await
        .assert_status(StatusCode::CREATED);

    let attempts = app.wait_for_attempts("/accounts/5/attempts", 3).await;
    assert_eq!(attempts.len(), 3);
    let outcomes: Vec<_> = attempts.iter().map(|a| a["outcome"].clone()).collect();
    assert_eq!(outcomes, vec![json!("failure"), json!("failure"), json!("success")]);
    let numbers: Vec<_> = attempts.iter().map(|a| a["attempt_number"].clone()).collect();
    assert_eq!(numbers, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(attempts[0]["http_status"], 500);
    assert_eq!(
        attempts[0]["error_message"],
        "destination responded with status 500"
    );
    let times: Vec<_> = attempts
        .iter()
        .map(|a| a["attempted_at"].as_str().unwrap().to_owned())
        .collect();
    assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
    app.shutdown().await;
}

#[tokio::test]
async fn should_filter_attempts_by_event() {
    let app = TestApp::spawn().await;
    let destination = TestDestination::ok().await;
    app.register(5, &destination.url()).await;

    let first: Value = app
        .server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "one" }))
        .await
        .json();
    app.server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "two" }))
        .await
        .assert_status(StatusCode::CREATED);
    app.wait_for_attempts("/accounts/5/attempts", 2).await;

    let path = format!(
        "/accounts/5/attempts?event_id={}",
        first["id"].as_str().unwrap()
    );
    let filtered = app.attempts(&path).await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["event_id"], first["id"]);

    let response = app
        .server
        .get("/accounts/5/attempts?event_id=not-a-uuid")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    app.shutdown().await;
}

#[tokio::test]
async fn should_answer_before_slow_destination_is_reached() {
    let app = TestApp::spawn().await;
    let destination = TestDestination::slow(Duration::from_secs(3)).await;
    app.register(5, &destination.url()).await;

    let started = Instant::now();
    app.server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "hello" }))
        .await
        .assert_status(StatusCode::CREATED);

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(destination.wait_for_hits(1, Duration::from_secs(2)).await);
    app.shutdown().await;
}

#[tokio::test]
async fn should_return_500_when_events_cannot_be_stored() {
    let app = TestApp::spawn().await;
    app.db
        .execute_unprepared("DROP TABLE attempts; DROP TABLE events;")
        .await
        .unwrap();

    let response = app
        .server
        .post("/accounts/5/events")
        .json(&json!({ "payload": "hello" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INTERNAL");
    app.shutdown().await;
}

// ── Routing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_return_404_for_unknown_route() {
    let app = TestApp::spawn().await;

    let response = app.server.get("/accounts/5/unknown").await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["kind"], "NOT_FOUND");
    app.shutdown().await;
}

#[tokio::test]
async fn should_return_404_for_non_numeric_account() {
    let app = TestApp::spawn().await;

    app.server
        .get("/accounts/abc/attempts")
        .await
        .assert_status_not_found();
    app.server
        .get("/accounts/-5/registrations")
        .await
        .assert_status_not_found();
    app.shutdown().await;
}

#[tokio::test]
async fn should_return_405_for_unsupported_method() {
    let app = TestApp::spawn().await;

    let response = app.server.delete("/accounts/5/registrations").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["kind"], "METHOD_NOT_ALLOWED");

    app.server
        .post("/accounts/5/attempts")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    app.server
        .get("/accounts/5/test")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    app.shutdown().await;
}

#[tokio::test]
async fn should_serve_health_and_request_id() {
    let app = TestApp::spawn().await;

    let response = app.server.get("/healthz").await;
    response.assert_status_ok();
    assert!(!response.header("x-request-id").is_empty());

    app.server.get("/readyz").await.assert_status_ok();
    app.shutdown().await;
}

//! HTTP delivery client.
//!
//! Sends one `POST` per call and folds every network-level result into an
//! [`Outcome`]. Redirects are not followed: a `3xx` is reported as a failed
//! outcome carrying its status. Holds no per-call state, so one client is
//! shared by all workers.

use std::error::Error as _;
use std::time::Instant;

use anyhow::Context as _;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use tracing::{Instrument, debug, info_span, warn};

use crate::domain::repository::DeliveryPort;
use crate::domain::types::{DeliveryRequest, Outcome, parse_destination_url};
use crate::error::WebhooksServiceError;

pub const USER_AGENT: &str = concat!("hookline/", env!("CARGO_PKG_VERSION"));

/// Response bodies are kept for audit up to this many bytes.
const MAX_CAPTURED_BODY: usize = 1024;

#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
}

impl HttpDeliveryClient {
    pub fn new() -> Result<Self, WebhooksServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build delivery http client")?;
        Ok(Self { client })
    }
}

impl DeliveryPort for HttpDeliveryClient {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<Outcome, WebhooksServiceError> {
        let url = parse_destination_url(&request.url)?;
        let span = info_span!("delivery", url = %url, timeout_ms = request.timeout.as_millis() as u64);

        async move {
            let attempted_at = Utc::now();
            let started = Instant::now();

            let mut http_request = self
                .client
                .post(url)
                .timeout(request.timeout)
                .header(CONTENT_TYPE, content_type_for(&request.payload))
                .body(request.payload.clone());
            for (name, value) in &request.headers {
                http_request = http_request.header(*name, value.as_str());
            }

            let response = match http_request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let duration = started.elapsed();
                    let error_message = describe_send_error(&e, request);
                    warn!(duration_ms = duration.as_millis() as u64, error = %error_message, "delivery failed");
                    return Ok(Outcome {
                        success: false,
                        http_status: None,
                        error_message: Some(error_message),
                        response_body: None,
                        duration,
                        attempted_at,
                    });
                }
            };

            let status = response.status();
            let response_body = match read_capped(response).await {
                Ok(bytes) => Some(truncate_body(&bytes)),
                Err(e) => {
                    debug!(error = %e, "failed to read response body");
                    None
                }
            };
            let duration = started.elapsed();
            let success = status.is_success();

            if success {
                debug!(status = status.as_u16(), duration_ms = duration.as_millis() as u64, "delivered");
            } else {
                warn!(status = status.as_u16(), duration_ms = duration.as_millis() as u64, "destination rejected delivery");
            }

            Ok(Outcome {
                success,
                http_status: Some(status.as_u16()),
                error_message: (!success)
                    .then(|| format!("destination responded with status {}", status.as_u16())),
                response_body,
                duration,
                attempted_at,
            })
        }
        .instrument(span)
        .await
    }
}

/// Payloads are opaque; JSON-looking ones are labelled as such for the receiver's benefit.
fn content_type_for(payload: &str) -> &'static str {
    if serde_json::from_str::<serde::de::IgnoredAny>(payload).is_ok() {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn describe_send_error(e: &reqwest::Error, request: &DeliveryRequest) -> String {
    if e.is_timeout() {
        return format!("timed out after {}ms", request.timeout.as_millis());
    }
    let mut message = if e.is_connect() {
        "connection failed".to_owned()
    } else {
        "request failed".to_owned()
    };
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Reads the body until just past [`MAX_CAPTURED_BODY`], leaving the rest unread.
async fn read_capped(mut response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
    let mut captured = Vec::new();
    while captured.len() <= MAX_CAPTURED_BODY {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let room = MAX_CAPTURED_BODY + 1 - captured.len();
        captured.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok(captured)
}

fn truncate_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_CAPTURED_BODY {
        return text.into_owned();
    }
    let mut end = MAX_CAPTURED_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &text[..end])
}

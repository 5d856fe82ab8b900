//! Local webhook destination for delivery tests.
//!
//! Binds an axum server to `127.0.0.1:0`, records every request it receives and
//! answers with a scripted sequence of status codes. The last status repeats once
//! the script is exhausted. A destination can also redirect or answer with a
//! custom body.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request captured by [`TestDestination`].
#[derive(Debug, Clone)]
pub struct ReceivedDelivery {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl ReceivedDelivery {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
struct DestinationState {
    statuses: Arc<Vec<StatusCode>>,
    delay: Duration,
    body: Arc<String>,
    /// Requests to any other path are answered with `302` to this one.
    redirect_to: Option<Arc<String>>,
    calls: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<ReceivedDelivery>>>,
}

pub struct TestDestination {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedDelivery>>>,
    handle: JoinHandle<()>,
}

impl TestDestination {
    /// Destination that accepts every delivery with `200 OK`.
    pub async fn ok() -> Self {
        Self::responding([200]).await
    }

    /// Destination answering with `statuses` in order.
    pub async fn responding(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self::start(statuses, Duration::ZERO).await
    }

    /// Destination that waits `delay` before answering `200 OK`.
    pub async fn slow(delay: Duration) -> Self {
        Self::start([200], delay).await
    }

    /// Destination answering `200 OK` with `body` instead of the usual `ack`.
    pub async fn with_body(body: impl Into<String>) -> Self {
        Self::launch([200], Duration::ZERO, body.into(), None).await
    }

    /// Destination that redirects every request to `path` with `302 Found`,
    /// and answers `200 OK` on `path` itself.
    pub async fn redirecting(path: &str) -> Self {
        Self::launch([200], Duration::ZERO, "ack".to_owned(), Some(path.to_owned())).await
    }

    /// # Panics
    ///
    /// Panics if a status is not a valid HTTP status code or the listener cannot bind.
    pub async fn start(statuses: impl IntoIterator<Item = u16>, delay: Duration) -> Self {
        Self::launch(statuses, delay, "ack".to_owned(), None).await
    }

    async fn launch(
        statuses: impl IntoIterator<Item = u16>,
        delay: Duration,
        body: String,
        redirect_to: Option<String>,
    ) -> Self {
        let mut statuses: Vec<StatusCode> = statuses
            .into_iter()
            .map(|code| StatusCode::from_u16(code).expect("valid status code"))
            .collect();
        if statuses.is_empty() {
            statuses.push(StatusCode::OK);
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let state = DestinationState {
            statuses: Arc::new(statuses),
            delay,
            body: Arc::new(body),
            redirect_to: redirect_to.map(Arc::new),
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::clone(&received),
        };

        let app = Router::new().fallback(receive).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test destination");
        let addr = listener.local_addr().expect("test destination address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "test destination stopped");
            }
        });

        Self {
            addr,
            received,
            handle,
        }
    }

    /// URL of the default hook path.
    pub fn url(&self) -> String {
        self.url_for("/hook")
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn received(&self) -> Vec<ReceivedDelivery> {
        self.received.lock().expect("received lock").clone()
    }

    pub fn hits(&self) -> usize {
        self.received.lock().expect("received lock").len()
    }

    /// Poll until at least `count` requests arrived. Returns `false` on timeout.
    pub async fn wait_for_hits(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.hits() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.hits() >= count
    }
}

impl Drop for TestDestination {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn receive(
    State(state): State<DestinationState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_owned();
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    state.received.lock().expect("received lock").push(ReceivedDelivery {
        method,
        path: path.clone(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    if let Some(target) = state.redirect_to.as_deref() {
        if path != *target {
            return (StatusCode::FOUND, [(LOCATION, target.clone())]).into_response();
        }
    }

    let index = call.min(state.statuses.len() - 1);
    (state.statuses[index], state.body.as_str().to_owned()).into_response()
}

/// URL on a loopback port with nothing listening, for connection-refused cases.
///
/// # Panics
///
/// Panics if no ephemeral port can be bound.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("ephemeral address");
    drop(listener);
    format!("http://{addr}/hook")
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, oneshot};
use tokio_util::sync::CancellationToken;

use hookline_webhooks::delivery::queue::{DeliveryQueue, DeliveryWorkerPool};
use hookline_webhooks::domain::repository::{DeliveryPort, DeliveryScheduler};
use hookline_webhooks::domain::types::{DeliveryRequest, Outcome};
use hookline_webhooks::error::WebhooksServiceError;

use crate::helpers::{MockAttemptRepo, Reply, ScriptedDelivery, fast_retry, test_job, test_pipeline};

async fn wait_for_attempts(attempts: &MockAttemptRepo, count: usize) -> bool {
    let handle = attempts.attempts_handle();
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.lock().unwrap().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn should_run_every_scheduled_job() {
    let attempts = MockAttemptRepo::empty();
    let pipeline = Arc::new(test_pipeline(
        ScriptedDelivery::always(Reply::Status(200)),
        attempts.clone(),
        fast_retry(3),
    ));
    let (queue, receiver) = DeliveryQueue::bounded(8, Duration::from_secs(1));
    let pool = DeliveryWorkerPool::spawn(pipeline, receiver, 2, CancellationToken::new());

    for _ in 0..3 {
        queue.schedule(test_job("http://example.com/hook")).await.unwrap();
    }

    assert!(wait_for_attempts(&attempts, 3).await);
    pool.shutdown_graceful(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn should_process_pairs_independently() {
    let attempts = MockAttemptRepo::empty();
    // First pair keeps failing; the second one must not wait for it.
    let pipeline = Arc::new(test_pipeline(
        ScriptedDelivery::always(Reply::Status(500)),
        attempts.clone(),
        fast_retry(2),
    ));
    let (queue, receiver) = DeliveryQueue::bounded(8, Duration::from_secs(1));
    let pool = DeliveryWorkerPool::spawn(pipeline, receiver, 2, CancellationToken::new());

    let first = test_job("http://example.com/a");
    let second = test_job("http://example.com/b");
    queue.schedule(first.clone()).await.unwrap();
    queue.schedule(second.clone()).await.unwrap();

    assert!(wait_for_attempts(&attempts, 6).await);
    let stored = attempts.attempts_handle();
    let stored = stored.lock().unwrap();
    for job in [&first, &second] {
        let per_pair: Vec<_> = stored
            .iter()
            .filter(|a| a.registration_id == job.registration.id)
            .collect();
        assert_eq!(per_pair.len(), 3);
        assert!(
            per_pair
                .windows(2)
                .all(|pair| pair[0].attempted_at <= pair[1].attempted_at)
        );
    }
    drop(stored);
    pool.shutdown_graceful(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn should_shut_down_idle_pool_quickly() {
    let pipeline = Arc::new(test_pipeline(
        ScriptedDelivery::always(Reply::Status(200)),
        MockAttemptRepo::empty(),
        fast_retry(3),
    ));
    let (_queue, receiver) = DeliveryQueue::bounded(8, Duration::from_secs(1));
    let pool = DeliveryWorkerPool::spawn(pipeline, receiver, 4, CancellationToken::new());

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        pool.shutdown_graceful(Duration::from_millis(500)),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}

#[tokio::test]
async fn should_interrupt_backoff_on_shutdown() {
    let attempts = MockAttemptRepo::empty();
    let mut retry = fast_retry(3);
    retry.base_delay = Duration::from_secs(60);
    retry.max_delay = Duration::from_secs(60);
    let pipeline = Arc::new(test_pipeline(
        ScriptedDelivery::always(Reply::Status(503)),
        attempts.clone(),
        retry,
    ));
    let (queue, receiver) = DeliveryQueue::bounded(8, Duration::from_secs(1));
    let pool = DeliveryWorkerPool::spawn(pipeline, receiver, 1, CancellationToken::new());

    queue.schedule(test_job("http://example.com/hook")).await.unwrap();
    assert!(wait_for_attempts(&attempts, 1).await);

    // The worker is parked in a 60s backoff; shutdown must not wait for it.
    pool.shutdown_graceful(Duration::from_secs(2)).await.unwrap();
    assert_eq!(attempts.attempts_handle().lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_jobs_once_workers_are_gone() {
    let pipeline = Arc::new(test_pipeline(
        ScriptedDelivery::always(Reply::Status(200)),
        MockAttemptRepo::empty(),
        fast_retry(3),
    ));
    let (queue, receiver) = DeliveryQueue::bounded(8, Duration::from_secs(1));
    let pool = DeliveryWorkerPool::spawn(pipeline, receiver, 1, CancellationToken::new());
    pool.shutdown_graceful(Duration::from_secs(1)).await.unwrap();

    let result = queue.schedule(test_job("http://example.com/hook")).await;

    assert!(matches!(result, Err(WebhooksServiceError::Internal(_))));
}

#[tokio::test(start_paused = true)]
async fn should_refuse_job_when_queue_stays_full() {
    let (queue, _receiver) = DeliveryQueue::bounded(1, Duration::from_millis(100));
    queue.schedule(test_job("http://example.com/a")).await.unwrap();

    let started = tokio::time::Instant::now();
    let result = queue.schedule(test_job("http://example.com/b")).await;

    assert!(matches!(result, Err(WebhooksServiceError::QueueFull)));
    assert!(started.elapsed() >= Duration::from_millis(100));
}

/// Delivery that never answers. Its sender is dropped with the call, which
/// tells the test when the worker running it was torn down.
struct StuckDelivery {
    entered: Arc<Notify>,
    alive: std::sync::Mutex<Option<oneshot::Sender<()>>>,
}

impl DeliveryPort for StuckDelivery {
    async fn deliver(&self, _request: &DeliveryRequest) -> Result<Outcome, WebhooksServiceError> {
        let _alive = self.alive.lock().unwrap().take();
        self.entered.notify_one();
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn should_abort_workers_still_running_after_grace() {
    let entered = Arc::new(Notify::new());
    let (alive_tx, alive_rx) = oneshot::channel();
    let pipeline = Arc::new(test_pipeline(
        StuckDelivery {
            entered: Arc::clone(&entered),
            alive: std::sync::Mutex::new(Some(alive_tx)),
        },
        MockAttemptRepo::empty(),
        fast_retry(3),
    ));
    let (queue, receiver) = DeliveryQueue::bounded(8, Duration::from_secs(1));
    let pool = DeliveryWorkerPool::spawn(pipeline, receiver, 1, CancellationToken::new());

    queue.schedule(test_job("http://example.com/a")).await.unwrap();
    entered.notified().await;
    // Left in the queue behind the stuck call.
    queue.schedule(test_job("http://example.com/b")).await.unwrap();

    let result = pool.shutdown_graceful(Duration::from_millis(500)).await;

    assert!(matches!(result, Err(WebhooksServiceError::Internal(_))));
    let torn_down = tokio::time::timeout(Duration::from_secs(1), alive_rx).await;
    assert!(matches!(torn_down, Ok(Err(_))), "stuck delivery was not aborted");
    assert!(queue.schedule(test_job("http://example.com/c")).await.is_err());
}

//! Bounded delivery queue and the worker pool draining it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::pipeline::DeliveryPipeline;
use crate::domain::repository::{AttemptRepository, DeliveryPort, DeliveryScheduler};
use crate::domain::types::DeliveryJob;
use crate::error::WebhooksServiceError;

/// Sending half of the delivery queue.
///
/// `schedule` waits up to `enqueue_timeout` while the queue is full, so a burst
/// of events slows ingestion down instead of growing memory without bound. Past
/// that wait the job is refused with [`WebhooksServiceError::QueueFull`].
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    sender: mpsc::Sender<DeliveryJob>,
    enqueue_timeout: Duration,
}

impl DeliveryQueue {
    pub fn bounded(
        capacity: usize,
        enqueue_timeout: Duration,
    ) -> (Self, mpsc::Receiver<DeliveryJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                enqueue_timeout,
            },
            receiver,
        )
    }
}

impl DeliveryScheduler for DeliveryQueue {
    async fn schedule(&self, job: DeliveryJob) -> Result<(), WebhooksServiceError> {
        match tokio::time::timeout(self.enqueue_timeout, self.sender.send(job)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(anyhow!("delivery queue is closed").into()),
            Err(_) => Err(WebhooksServiceError::QueueFull),
        }
    }
}

/// Fixed set of workers, each running one pipeline at a time.
pub struct DeliveryWorkerPool {
    cancel: CancellationToken,
    receiver: Arc<Mutex<mpsc::Receiver<DeliveryJob>>>,
    handles: Vec<JoinHandle<()>>,
}

impl DeliveryWorkerPool {
    pub fn spawn<D, A>(
        pipeline: Arc<DeliveryPipeline<D, A>>,
        receiver: mpsc::Receiver<DeliveryJob>,
        worker_count: usize,
        cancel: CancellationToken,
    ) -> Self
    where
        D: DeliveryPort + 'static,
        A: AttemptRepository + 'static,
    {
        let receiver = Arc::new(Mutex::new(receiver));
        let worker_count = worker_count.max(1);
        let handles = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&pipeline),
                    Arc::clone(&receiver),
                    cancel.clone(),
                ))
            })
            .collect();

        info!(worker_count, "delivery workers started");
        Self {
            cancel,
            receiver,
            handles,
        }
    }

    /// Stop taking new jobs, let in-flight attempts finish within `grace`.
    ///
    /// Jobs still queued are dropped and counted in the log.
    pub async fn shutdown_graceful(self, grace: Duration) -> Result<(), WebhooksServiceError> {
        info!(grace_ms = grace.as_millis() as u64, "stopping delivery workers");
        self.cancel.cancel();

        let handles = self.handles;
        let abort_handles: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(grace, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!(error = %e, "delivery worker panicked");
                }
            }
        })
        .await;

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut dropped = 0_usize;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "queued deliveries dropped at shutdown");
        }

        match joined {
            Ok(()) => {
                info!("delivery workers stopped");
                Ok(())
            }
            Err(_) => {
                for handle in abort_handles {
                    handle.abort();
                }
                error!(grace_ms = grace.as_millis() as u64, "delivery workers did not stop in time");
                Err(anyhow!("delivery workers did not stop within {}ms", grace.as_millis()).into())
            }
        }
    }
}

async fn run_worker<D, A>(
    worker_id: usize,
    pipeline: Arc<DeliveryPipeline<D, A>>,
    receiver: Arc<Mutex<mpsc::Receiver<DeliveryJob>>>,
    cancel: CancellationToken,
) where
    D: DeliveryPort,
    A: AttemptRepository,
{
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = next_job(&receiver) => job,
        };
        let Some(job) = job else {
            break;
        };
        let state = pipeline.run(&job, &cancel).await;
        debug!(worker_id, event_id = %job.event.id, registration_id = %job.registration.id, ?state, "pipeline finished");
    }
    debug!(worker_id, "delivery worker exiting");
}

async fn next_job(receiver: &Mutex<mpsc::Receiver<DeliveryJob>>) -> Option<DeliveryJob> {
    receiver.lock().await.recv().await
}

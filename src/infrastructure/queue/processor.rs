//! Background queue of image jobs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::domain::{DomainError, ImageJob, JobId, QueueSnapshot};
use crate::infrastructure::observability::set_queue_depth;

use super::pipeline::{JobOutcome, JobPipeline};

#[derive(Debug, Default)]
struct QueueStats {
    pending: AtomicU64,
    in_flight: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl QueueStats {
    fn enqueued(&self) {
        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        set_queue_depth(pending);
    }

    fn started(&self) {
        let pending = self.pending.fetch_sub(1, Ordering::SeqCst) - 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        set_queue_depth(pending);
    }

    fn finished(&self, outcome: &JobOutcome) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match outcome {
            JobOutcome::Finished { .. } => self.completed.fetch_add(1, Ordering::SeqCst),
            JobOutcome::Failed => self.failed.fetch_add(1, Ordering::SeqCst),
        };
    }
}

/// FIFO job queue drained by a single dispatcher task
///
/// At most `max_workers` jobs run at once. Failed jobs are reported and
/// counted; they never stop the queue.
#[derive(Debug)]
pub struct QueueProcessor {
    sender: Mutex<Option<mpsc::UnboundedSender<ImageJob>>>,
    accepting: AtomicBool,
    stats: Arc<QueueStats>,
    dispatcher: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    max_workers: usize,
}

impl QueueProcessor {
    /// Spawn the dispatcher on the current runtime
    pub fn start(pipeline: JobPipeline, config: &QueueConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(QueueStats::default());

        let dispatcher = tokio::spawn(dispatch(
            receiver,
            Arc::new(pipeline),
            stats.clone(),
            max_workers,
        ));

        info!(max_workers, "Queue processor started");

        Self {
            sender: Mutex::new(Some(sender)),
            accepting: AtomicBool::new(true),
            stats,
            dispatcher: tokio::sync::Mutex::new(Some(dispatcher)),
            max_workers,
        }
    }

    /// Append a job; returns without waiting for processing
    pub fn enqueue(&self, image_url: impl Into<String>, result_id: i64) -> Result<JobId, DomainError> {
        let job = ImageJob::new(image_url, result_id);
        let id = job.id;

        let sender = self
            .sender
            .lock()
            .map_err(|_| DomainError::internal("Queue sender lock poisoned"))?;

        let Some(sender) = sender.as_ref() else {
            return Err(DomainError::queue("Queue is shut down"));
        };

        info!(
            job_id = %id,
            result_id,
            image_url = %job.image_url,
            "Added image to queue"
        );

        self.stats.enqueued();
        if sender.send(job).is_err() {
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(DomainError::queue("Queue is shut down"));
        }

        Ok(id)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.stats.pending.load(Ordering::SeqCst),
            in_flight: self.stats.in_flight.load(Ordering::SeqCst),
            completed: self.stats.completed.load(Ordering::SeqCst),
            failed: self.stats.failed.load(Ordering::SeqCst),
            accepting: self.is_accepting(),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Stop accepting jobs and wait for queued and running ones
    ///
    /// Returns `false` when `timeout` elapsed first; remaining jobs are
    /// abandoned with the runtime.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.accepting.store(false, Ordering::SeqCst);
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let Some(handle) = self.dispatcher.lock().await.take() else {
            return true;
        };

        let snapshot = self.snapshot();
        info!(
            pending = snapshot.pending,
            in_flight = snapshot.in_flight,
            "Draining queue"
        );

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => {
                info!("Queue drained");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "Queue dispatcher failed");
                false
            }
            Err(_) => {
                let snapshot = self.snapshot();
                warn!(
                    pending = snapshot.pending,
                    in_flight = snapshot.in_flight,
                    "Queue drain timed out"
                );
                false
            }
        }
    }
}

async fn dispatch(
    mut receiver: mpsc::UnboundedReceiver<ImageJob>,
    pipeline: Arc<JobPipeline>,
    stats: Arc<QueueStats>,
    max_workers: usize,
) {
    let permits = Arc::new(Semaphore::new(max_workers));
    let mut workers = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        stats.started();
        let pipeline = pipeline.clone();
        let stats = stats.clone();

        workers.spawn(async move {
            let _permit = permit;
            let outcome = pipeline.run(&job).await;
            debug!(job_id = %job.id, status = %outcome.status(), "Job done");
            stats.finished(&outcome);
        });

        while let Some(result) = workers.try_join_next() {
            log_worker_result(result);
        }
    }

    while let Some(result) = workers.join_next().await {
        log_worker_result(result);
    }
}

fn log_worker_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Queue worker panicked");
    }
}

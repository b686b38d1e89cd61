use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use rand::Rng;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{JobError, QueueError, QueueResult};
use crate::queue::Queue;
use crate::store::JobStore;
use crate::types::JobRecord;

/// Domain processing capability bound to one worker.
///
/// The record carries the job id and the business entity id; the processor
/// does the actual work (call the embedding API, parse the document, run the
/// sync) and reports the outcome. Returning [`JobError::Transient`] schedules
/// a backoff retry; [`JobError::Terminal`] fails the job permanently.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    async fn process(&self, job: &JobRecord) -> Result<(), JobError>;
}

#[async_trait]
impl<P: Processor + ?Sized> Processor for Arc<P> {
    async fn process(&self, job: &JobRecord) -> Result<(), JobError> {
        (**self).process(job).await
    }
}

/// Running counters for one worker, safe for concurrent read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerMetrics {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// State shared between the worker handle and its spawned loop
struct WorkerShared {
    running: AtomicBool,
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl WorkerShared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WorkerMetrics {
        WorkerMetrics {
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Polling worker bound to one queue and one processor.
///
/// Parallelism across jobs comes from running multiple workers against the
/// same queue, not from this type fanning out internally - each worker
/// processes its claimed batch sequentially within the tick.
pub struct Worker<S: JobStore> {
    queue: Queue<S>,
    config: WorkerConfig,
    shared: Arc<WorkerShared>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: JobStore> Worker<S> {
    pub fn new(queue: Queue<S>, config: WorkerConfig) -> Self {
        Self {
            queue,
            config,
            shared: Arc::new(WorkerShared::new()),
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Spawn the polling loop with the given processor.
    ///
    /// Runs one stale-recovery pass first when `recover_stale_on_start` is
    /// set. Returns [`QueueError::WorkerAlreadyRunning`] if already started.
    pub fn start<P: Processor>(&mut self, processor: P) -> QueueResult<()> {
        if self.handle.is_some() {
            return Err(QueueError::WorkerAlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shared.running.store(true, Ordering::SeqCst);

        let worker_loop = WorkerLoop {
            queue: self.queue.clone(),
            config: self.config.clone(),
            shared: self.shared.clone(),
            processor: Box::new(processor),
        };

        let handle = tokio::spawn(worker_loop.run(shutdown_rx));

        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Signal shutdown and wait for the loop to finish its in-flight batch.
    ///
    /// Shutdown is not abortive: callers needing a hard deadline should wrap
    /// this with their own timeout and rely on stale recovery on next start.
    pub async fn stop(&mut self) -> QueueResult<()> {
        let shutdown_tx = self
            .shutdown_tx
            .take()
            .ok_or(QueueError::WorkerNotRunning)?;
        let handle = self.handle.take().ok_or(QueueError::WorkerNotRunning)?;

        let _ = shutdown_tx.send(());
        handle
            .await
            .map_err(|e| QueueError::WorkerPanicked(e.to_string()))?;
        Ok(())
    }

    /// Snapshot of the running counters
    pub fn metrics(&self) -> WorkerMetrics {
        self.shared.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// The spawned half of a worker: owns the loop until shutdown
struct WorkerLoop<S: JobStore> {
    queue: Queue<S>,
    config: WorkerConfig,
    shared: Arc<WorkerShared>,
    processor: Box<dyn Processor>,
}

impl<S: JobStore> WorkerLoop<S> {
    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        if self.config.recover_stale_on_start {
            match self.queue.recover_stale(self.config.stale_threshold).await {
                Ok(0) => {}
                Ok(count) => info!(worker = %self.config.name, count, "Recovered stale jobs"),
                Err(e) => error!(worker = %self.config.name, error = %e, "Stale recovery failed"),
            }
        }

        info!(worker = %self.config.name, "Worker started");

        loop {
            match shutdown_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Empty) => {}
            }

            let batch = match self.queue.dequeue(self.config.batch_size).await {
                Ok(batch) => batch,
                Err(e) => {
                    // Transient storage trouble self-heals; skip the tick
                    error!(worker = %self.config.name, error = %e, "Failed to claim batch");
                    if self.idle_wait(&mut shutdown_rx).await {
                        break;
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                if self.idle_wait(&mut shutdown_rx).await {
                    break;
                }
                continue;
            }

            debug!(worker = %self.config.name, count = batch.len(), "Processing batch");
            for job in &batch.jobs {
                self.run_job(job).await;
            }
            // Re-poll immediately after a non-empty batch to avoid idle latency
        }

        self.shared.running.store(false, Ordering::SeqCst);
        info!(worker = %self.config.name, "Worker stopped");
    }

    async fn run_job(&self, job: &JobRecord) {
        let outcome = match AssertUnwindSafe(self.processor.process(job))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(JobError::transient(panic_message(panic.as_ref()))),
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = self.queue.complete(&job.id).await {
                    error!(worker = %self.config.name, job_id = %job.id, error = %e,
                        "Failed to mark job completed");
                }
                self.shared.record_success();
            }
            Err(job_error) => {
                warn!(worker = %self.config.name, job_id = %job.id, error = %job_error,
                    "Job failed");
                if let Err(e) = self.queue.fail(&job.id, &job_error).await {
                    error!(worker = %self.config.name, job_id = %job.id, error = %e,
                        "Failed to mark job failed");
                }
                self.shared.record_failure();
            }
        }
    }

    /// Sleep out the poll interval, returning true if shutdown arrived first
    async fn idle_wait(&self, shutdown_rx: &mut oneshot::Receiver<()>) -> bool {
        tokio::select! {
            _ = &mut *shutdown_rx => true,
            _ = sleep(self.sleep_duration_with_jitter()) => false,
        }
    }

    fn sleep_duration_with_jitter(&self) -> Duration {
        if self.config.jitter.is_zero() {
            return self.config.poll_interval;
        }

        let jitter_millis = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        let random_jitter = rand::thread_rng().gen_range(0..=jitter_millis);
        self.config.poll_interval + Duration::from_millis(random_jitter)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("job processor panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("job processor panicked: {msg}")
    } else {
        "job processor panicked".to_string()
    }
}

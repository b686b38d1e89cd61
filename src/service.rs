use std::sync::Arc;

use crate::config::{QueueConfig, WorkerConfig};
use crate::error::QueueResult;
use crate::queue::Queue;
use crate::store::JobStore;
use crate::types::{JobId, JobPriority, QueueStats};
use crate::worker::{Processor, Worker, WorkerMetrics};

/// One domain job type: a queue and its worker under a single handle.
///
/// Each domain service (chunk embedding, document parsing, sync, extraction)
/// is an instance of this shape - a table name, an entity column, and a
/// processor. The producer side enqueues, the consumer side is the worker
/// lifecycle, and the admin side reads stats.
pub struct JobService<S: JobStore> {
    queue: Queue<S>,
    worker: Worker<S>,
}

impl<S: JobStore> JobService<S> {
    pub fn new(store: Arc<S>, queue_config: QueueConfig, worker_config: WorkerConfig) -> Self {
        let queue = Queue::new(store, queue_config);
        let worker = Worker::new(queue.clone(), worker_config);
        Self { queue, worker }
    }

    /// Producer surface: insert a job for the given entity
    pub async fn enqueue(&self, entity_id: &str) -> QueueResult<JobId> {
        self.queue.enqueue(entity_id).await
    }

    /// Producer surface with explicit priority
    pub async fn enqueue_with_priority(
        &self,
        entity_id: &str,
        priority: JobPriority,
    ) -> QueueResult<JobId> {
        self.queue.enqueue_with_priority(entity_id, priority).await
    }

    /// Start the worker with the domain processor
    pub fn start<P: Processor>(&mut self, processor: P) -> QueueResult<()> {
        self.worker.start(processor)
    }

    /// Stop the worker, letting the in-flight batch finish
    pub async fn stop(&mut self) -> QueueResult<()> {
        self.worker.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn metrics(&self) -> WorkerMetrics {
        self.worker.metrics()
    }

    /// Admin surface: row counts per status
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        self.queue.stats().await
    }

    /// Direct queue access, for admin tooling (manual retry, inspection)
    pub fn queue(&self) -> &Queue<S> {
        &self.queue
    }
}

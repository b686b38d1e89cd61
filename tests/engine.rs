use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use jobwell::prelude::*;
use jobwell::JobEvent;

/// Test factory functions
fn test_queue_config() -> QueueConfig {
    QueueConfig::new("kb.test_jobs", "object_id")
}

fn fast_worker_config(name: &str) -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(10),
        ..WorkerConfig::new(name)
    }
}

async fn receive_next_event(stream: &mut BroadcastStream<JobEvent>) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("Timeout waiting for event")
        .expect("Stream ended")
        .expect("Event receive error")
}

/// Processor that records a "vector" per entity, like an embedding backfill
struct EmbeddingProcessor {
    vectors: Mutex<Vec<String>>,
}

impl EmbeddingProcessor {
    fn new() -> Self {
        Self {
            vectors: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Processor for EmbeddingProcessor {
    async fn process(&self, job: &JobRecord) -> Result<(), JobError> {
        self.vectors.lock().push(job.entity_id.clone());
        Ok(())
    }
}

/// Concurrent dequeuers against one queue never claim the same job twice
#[tokio::test]
async fn concurrent_dequeuers_never_share_a_claim() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(Queue::new(store, test_queue_config()));

    for i in 0..100 {
        queue.enqueue(&format!("chunk-{i}")).await.unwrap();
    }

    let claimed: Arc<Mutex<Vec<JobId>>> = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        let claimed = claimed.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let batch = queue.dequeue(5).await.unwrap();
                if batch.is_empty() {
                    break;
                }
                claimed.lock().extend(batch.ids());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let all = claimed.lock();
    assert_eq!(all.len(), 100);
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(unique.len(), 100, "a job id was claimed more than once");
}

/// Two workers sharing one queue split the backlog without overlap
#[tokio::test]
async fn two_workers_split_the_backlog() {
    let store = Arc::new(MemoryStore::new());
    let queue = Queue::new(store, test_queue_config());

    for i in 0..40 {
        queue.enqueue(&format!("doc-{i}")).await.unwrap();
    }

    let processor = Arc::new(EmbeddingProcessor::new());
    let mut worker_a = Worker::new(queue.clone(), fast_worker_config("worker-a"));
    let mut worker_b = Worker::new(queue.clone(), fast_worker_config("worker-b"));
    worker_a.start(processor.clone()).unwrap();
    worker_b.start(processor.clone()).unwrap();

    sleep(Duration::from_millis(200)).await;
    worker_a.stop().await.unwrap();
    worker_b.stop().await.unwrap();

    // Every job processed exactly once across both workers
    let vectors = processor.vectors.lock();
    assert_eq!(vectors.len(), 40);
    let unique: HashSet<_> = vectors.iter().collect();
    assert_eq!(unique.len(), 40);

    let a = worker_a.metrics();
    let b = worker_b.metrics();
    assert_eq!(a.processed + b.processed, 40);
    assert_eq!(a.succeeded + b.succeeded, 40);

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.completed, 40);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.processing, 0);
}

/// Embedding-backfill style domain service, end to end
#[tokio::test]
async fn embedding_service_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let mut service = JobService::new(
        store,
        QueueConfig::new("kb.chunk_embedding_jobs", "chunk_id"),
        fast_worker_config("embedding-worker"),
    );

    for i in 0..5 {
        service.enqueue(&format!("chunk-{i}")).await.unwrap();
    }

    let processor = Arc::new(EmbeddingProcessor::new());
    service.start(processor.clone()).unwrap();
    assert!(service.is_running());

    sleep(Duration::from_millis(150)).await;
    service.stop().await.unwrap();
    assert!(!service.is_running());

    assert_eq!(processor.vectors.lock().len(), 5);
    let metrics = service.metrics();
    assert_eq!(metrics.processed, 5);
    assert_eq!(metrics.succeeded, 5);
    assert_eq!(metrics.failed, 0);

    let stats = service.stats().await.unwrap();
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.total(), 5);
}

/// Walk a job through retry to terminal failure with a two-attempt budget
#[tokio::test]
async fn retry_budget_walk_to_terminal() {
    let store = Arc::new(MemoryStore::new());
    let config = QueueConfig {
        max_attempts: 2,
        ..test_queue_config()
    };
    let queue = Queue::new(store.clone(), config);

    let job_id = queue.enqueue("doc-13").await.unwrap();

    // First attempt: transient failure schedules a ~60s retry
    let batch = queue.dequeue(1).await.unwrap();
    assert_eq!(batch.ids(), vec![job_id.clone()]);
    queue
        .fail(&job_id, &JobError::transient("parser crashed"))
        .await
        .unwrap();
    let record = queue.record(&job_id).await.unwrap().unwrap();
    assert_eq!(record.status.name(), "pending");
    assert_eq!(record.attempts, 1);

    // Not eligible until the retry time passes
    assert!(queue.dequeue(1).await.unwrap().is_empty());

    // Second attempt after the retry window: failure is terminal
    store.force_retry_due(&job_id);
    let batch = queue.dequeue(1).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.jobs[0].attempts, 2);
    queue
        .fail(&job_id, &JobError::transient("parser crashed again"))
        .await
        .unwrap();

    let record = queue.record(&job_id).await.unwrap().unwrap();
    assert_eq!(record.status.name(), "failed");
    assert_eq!(record.attempts, 2);
    assert_eq!(record.last_error.as_deref(), Some("parser crashed again"));

    // Evidence of failure stays visible to admin tooling
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
}

/// Lifecycle events arrive in order over the store's broadcast stream
#[tokio::test]
async fn store_emits_lifecycle_events() {
    let store = Arc::new(MemoryStore::new());
    let queue = Queue::new(store.clone(), test_queue_config());

    let mut events = BroadcastStream::new(store.subscribe());

    // Enqueue -> Enqueued
    let job_id = queue.enqueue("chunk-9").await.unwrap();
    let event = receive_next_event(&mut events).await;
    match event {
        JobEvent::Enqueued {
            job_id: event_job_id,
            entity_id,
            ..
        } => {
            assert_eq!(event_job_id, job_id);
            assert_eq!(entity_id, "chunk-9");
        }
        other => panic!("Expected Enqueued event, got: {other:?}"),
    }

    // Dequeue -> Claimed with the attempt number
    queue.dequeue(1).await.unwrap();
    let event = receive_next_event(&mut events).await;
    assert!(matches!(
        event,
        JobEvent::Claimed { job_id: ref id, attempt: 1, .. } if *id == job_id
    ));

    // Fail -> Retrying with the recorded error
    queue
        .fail(&job_id, &JobError::transient("embed timeout"))
        .await
        .unwrap();
    let event = receive_next_event(&mut events).await;
    match event {
        JobEvent::Retrying { error, .. } => assert_eq!(error, "embed timeout"),
        other => panic!("Expected Retrying event, got: {other:?}"),
    }

    // Complete (after re-claim) -> Completed
    store.force_retry_due(&job_id);
    queue.dequeue(1).await.unwrap();
    receive_next_event(&mut events).await; // second Claimed
    queue.complete(&job_id).await.unwrap();
    let event = receive_next_event(&mut events).await;
    assert_eq!(event.event_name(), "completed");
    assert_eq!(event.job_id(), &job_id);
}

/// A worker left mid-claim is recovered by the next worker's startup pass
#[tokio::test]
async fn crashed_worker_claims_are_recovered_on_next_start() {
    let store = Arc::new(MemoryStore::new());
    let queue = Queue::new(store.clone(), test_queue_config());

    // Simulate a crash: claim without ever acking
    let job_id = queue.enqueue("chunk-stuck").await.unwrap();
    queue.dequeue(1).await.unwrap();
    store.force_stale(&job_id, chrono::Duration::minutes(30));

    let processor = Arc::new(EmbeddingProcessor::new());
    let mut worker = Worker::new(queue.clone(), fast_worker_config("replacement"));
    worker.start(processor.clone()).unwrap();
    sleep(Duration::from_millis(100)).await;
    worker.stop().await.unwrap();

    assert_eq!(processor.vectors.lock().as_slice(), ["chunk-stuck"]);
    let record = queue.record(&job_id).await.unwrap().unwrap();
    assert_eq!(record.status.name(), "completed");
}

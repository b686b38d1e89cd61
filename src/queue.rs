use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::config::QueueConfig;
use crate::error::{JobError, QueueResult};
use crate::store::JobStore;
use crate::types::{JobId, JobPriority, JobRecord, QueueStats};

/// Upper bound on stored error text, to cap storage growth from
/// stack-trace-laden provider errors
const MAX_ERROR_LEN: usize = 500;

/// Result of one dequeue call: the batch of records this caller now owns
#[derive(Debug, Clone, Default)]
pub struct DequeueResult {
    pub jobs: Vec<JobRecord>,
}

impl DequeueResult {
    /// Ids of the claimed jobs
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Generic operations over one job table.
///
/// The store provides the atomic claim; the queue layers policy on top:
/// retry backoff, error truncation, and the retry-vs-terminal decision.
pub struct Queue<S: JobStore> {
    store: Arc<S>,
    config: QueueConfig,
}

impl<S: JobStore> Clone for Queue<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: JobStore> Queue<S> {
    pub fn new(store: Arc<S>, config: QueueConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Insert a new job for the given entity, eligible immediately.
    ///
    /// No dedup happens at this layer - enqueuing the same entity twice
    /// produces two independent jobs.
    pub async fn enqueue(&self, entity_id: &str) -> QueueResult<JobId> {
        self.enqueue_with_priority(entity_id, JobPriority::default())
            .await
    }

    /// Insert a new job with an explicit priority
    pub async fn enqueue_with_priority(
        &self,
        entity_id: &str,
        priority: JobPriority,
    ) -> QueueResult<JobId> {
        let record = JobRecord::new(JobId::new(), entity_id.to_string(), priority);
        let job_id = record.id.clone();
        self.store.insert(record).await?;
        debug!(
            table = %self.config.table,
            job_id = %job_id,
            entity_id,
            "Enqueued job"
        );
        Ok(job_id)
    }

    /// Atomically claim up to `batch_size` eligible jobs.
    ///
    /// Returns an empty result (not an error) when nothing is eligible.
    pub async fn dequeue(&self, batch_size: usize) -> QueueResult<DequeueResult> {
        let jobs = self.store.claim(Utc::now(), batch_size).await?;
        if !jobs.is_empty() {
            debug!(table = %self.config.table, count = jobs.len(), "Claimed batch");
        }
        Ok(DequeueResult { jobs })
    }

    /// Mark a job completed. Idempotent on already-settled jobs.
    pub async fn complete(&self, id: &JobId) -> QueueResult<()> {
        self.store.mark_completed(id).await
    }

    /// Mark a job delivered. Idempotent on already-settled jobs.
    pub async fn mark_sent(&self, id: &JobId) -> QueueResult<()> {
        self.store.mark_sent(id).await
    }

    /// Record a failure and either requeue with backoff or fail terminally.
    ///
    /// A [`JobError::Terminal`] never retries. A [`JobError::Transient`]
    /// retries after `min(base * 2^(attempts-1), max)` seconds unless the
    /// attempt budget is exhausted (`max_attempts > 0` and
    /// `attempts >= max_attempts`). A no-op if the job is already settled.
    pub async fn fail(&self, id: &JobId, error: &JobError) -> QueueResult<()> {
        let record = self
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| crate::QueueError::JobNotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Ok(());
        }

        let truncated = truncate_error(error.message());
        let retry_at = if error.is_retryable() && self.attempts_remain(record.attempts) {
            Some(Utc::now() + chrono::Duration::seconds(self.retry_delay_secs(record.attempts) as i64))
        } else {
            None
        };

        debug!(
            table = %self.config.table,
            job_id = %id,
            attempts = record.attempts,
            retrying = retry_at.is_some(),
            "Job failed"
        );
        self.store.mark_failed(id, truncated, retry_at).await
    }

    /// Return abandoned claims older than `threshold` to the pending state
    pub async fn recover_stale(&self, threshold: Duration) -> QueueResult<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(threshold).unwrap_or_else(|_| chrono::Duration::days(365));
        self.store.reset_stale(cutoff).await
    }

    /// Row counts per status
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        self.store.counts().await
    }

    /// Fetch one record, for admin tooling and retry inspection
    pub async fn record(&self, id: &JobId) -> QueueResult<Option<JobRecord>> {
        self.store.fetch(id).await
    }

    fn attempts_remain(&self, attempts: u32) -> bool {
        self.config.max_attempts == 0 || attempts < self.config.max_attempts
    }

    /// Exponential backoff with a floor and ceiling:
    /// `min(base * 2^(attempts-1), max)`
    fn retry_delay_secs(&self, attempts: u32) -> u64 {
        backoff_delay(
            self.config.base_retry_delay_secs,
            self.config.max_retry_delay_secs,
            attempts,
        )
    }
}

fn truncate_error(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_LEN {
        message.to_string()
    } else {
        message.chars().take(MAX_ERROR_LEN).collect()
    }
}

/// When the next retry would run, relative to now, for a failed attempt.
/// Exposed for admin tooling that projects retry schedules.
pub fn backoff_delay(base_secs: u64, max_secs: u64, attempts: u32) -> u64 {
    let exponent = attempts.saturating_sub(1).min(31);
    base_secs.saturating_mul(2_u64.pow(exponent)).min(max_secs)
}

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::store::JobStore;
use crate::{JobEvent, JobId, JobRecord, JobStatus, QueueError, QueueResult, QueueStats};

/// In-process reference backend.
///
/// Claim exclusivity comes from taking the records map's write lock for the
/// whole batch selection, so a batch is claimed or skipped as a unit - two
/// concurrent claimers can never both see the same pending row.
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<JobId, JobRecord>>>,
    event_broadcaster: broadcast::Sender<JobEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (event_broadcaster, _) = broadcast::channel(1024);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            event_broadcaster,
        }
    }

    /// Subscribe to lifecycle events for observability
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_broadcaster.subscribe()
    }

    fn emit(&self, event: JobEvent) {
        // Dropped silently when nobody is subscribed
        let _ = self.event_broadcaster.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            event_broadcaster: self.event_broadcaster.clone(),
        }
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, record: JobRecord) -> QueueResult<()> {
        let event = JobEvent::Enqueued {
            job_id: record.id.clone(),
            entity_id: record.entity_id.clone(),
            at: record.created_at,
        };
        self.records.write().insert(record.id.clone(), record);
        self.emit(event);
        Ok(())
    }

    async fn claim(&self, now: DateTime<Utc>, limit: usize) -> QueueResult<Vec<JobRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut records = self.records.write();

        let mut eligible: Vec<JobId> = records
            .values()
            .filter(|r| r.is_eligible(now))
            .map(|r| r.id.clone())
            .collect();

        eligible.sort_by_key(|id| {
            let r = &records[id];
            (Reverse(r.priority), r.created_at)
        });
        eligible.truncate(limit);

        let mut claimed = Vec::with_capacity(eligible.len());
        for id in eligible {
            if let Some(record) = records.get_mut(&id) {
                record.begin_attempt(now);
                claimed.push(record.clone());
            }
        }

        drop(records);

        for record in &claimed {
            self.emit(JobEvent::Claimed {
                job_id: record.id.clone(),
                attempt: record.attempts,
                at: now,
            });
        }

        Ok(claimed)
    }

    async fn mark_completed(&self, id: &JobId) -> QueueResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;

        // Idempotent: a late completion signal never flips a settled row
        if record.status.is_terminal() {
            return Ok(());
        }

        record.complete();
        let at = record.updated_at;
        drop(records);

        self.emit(JobEvent::Completed {
            job_id: id.clone(),
            at,
        });
        Ok(())
    }

    async fn mark_sent(&self, id: &JobId) -> QueueResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Ok(());
        }

        record.mark_sent();
        let at = record.updated_at;
        drop(records);

        self.emit(JobEvent::Completed {
            job_id: id.clone(),
            at,
        });
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: &JobId,
        error: String,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Ok(());
        }

        let event = match retry_at {
            Some(retry_time) => {
                record.schedule_retry(retry_time, error.clone());
                JobEvent::Retrying {
                    job_id: id.clone(),
                    retry_at: retry_time,
                    error,
                    at: record.updated_at,
                }
            }
            None => {
                record.fail_terminal(error.clone());
                JobEvent::Failed {
                    job_id: id.clone(),
                    error,
                    at: record.updated_at,
                }
            }
        };
        drop(records);

        self.emit(event);
        Ok(())
    }

    async fn reset_stale(&self, cutoff: DateTime<Utc>) -> QueueResult<usize> {
        let now = Utc::now();
        let mut recovered = Vec::new();

        {
            let mut records = self.records.write();
            for record in records.values_mut() {
                if record.status.is_processing() && record.updated_at < cutoff {
                    record.reset_to_pending(now);
                    recovered.push(record.id.clone());
                }
            }
        }

        for job_id in &recovered {
            self.emit(JobEvent::Recovered {
                job_id: job_id.clone(),
                at: now,
            });
        }

        Ok(recovered.len())
    }

    async fn counts(&self) -> QueueResult<QueueStats> {
        let records = self.records.read();
        let mut stats = QueueStats::default();
        for record in records.values() {
            match record.status {
                JobStatus::Pending { .. } => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed { .. } => stats.completed += 1,
                JobStatus::Failed { .. } => stats.failed += 1,
                JobStatus::Sent { .. } => stats.sent += 1,
            }
        }
        Ok(stats)
    }

    async fn fetch(&self, id: &JobId) -> QueueResult<Option<JobRecord>> {
        Ok(self.records.read().get(id).cloned())
    }
}

/// Test helpers for deterministic testing
impl MemoryStore {
    /// Backdate a pending row's retry time so it is eligible now (test helper)
    pub fn force_retry_due(&self, id: &JobId) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(id) {
            if let JobStatus::Pending {
                ref mut next_retry_at,
            } = record.status
            {
                *next_retry_at = Utc::now() - chrono::Duration::seconds(1);
            }
        }
    }

    /// Backdate a processing row's `updated_at` past the given age (test helper)
    pub fn force_stale(&self, id: &JobId, age: chrono::Duration) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(id) {
            if record.status.is_processing() {
                record.updated_at = Utc::now() - age;
            }
        }
    }
}

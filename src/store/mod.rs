pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{JobId, JobRecord, QueueResult, QueueStats};

/// Storage capability contract for one job table.
///
/// Any store offering atomic "claim N eligible rows and mark them in-flight"
/// semantics satisfies this trait - row-level locking, conditional updates,
/// or a single write lock all qualify. Implementations must guarantee that
/// two concurrent `claim` calls never return the same record.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Persist a new record
    async fn insert(&self, record: JobRecord) -> QueueResult<()>;

    /// Atomically claim up to `limit` eligible records.
    ///
    /// Eligible means pending with `next_retry_at <= now`. Claimed records
    /// are flipped to processing with the attempt counted, ordered by
    /// priority (descending) then `created_at` (ascending).
    async fn claim(&self, now: DateTime<Utc>, limit: usize) -> QueueResult<Vec<JobRecord>>;

    /// Mark a record completed. No-op on rows already terminal.
    async fn mark_completed(&self, id: &JobId) -> QueueResult<()>;

    /// Mark a record sent. No-op on rows already terminal.
    async fn mark_sent(&self, id: &JobId) -> QueueResult<()>;

    /// Record a failure.
    ///
    /// `retry_at = Some(..)` requeues the row as pending for that time;
    /// `None` fails it terminally. Either way `last_error` is recorded.
    /// No-op on rows already terminal.
    async fn mark_failed(
        &self,
        id: &JobId,
        error: String,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()>;

    /// Return every processing row with `updated_at < cutoff` to pending,
    /// eligible immediately. Attempts are untouched. Returns the count reset.
    async fn reset_stale(&self, cutoff: DateTime<Utc>) -> QueueResult<usize>;

    /// Row counts per status
    async fn counts(&self) -> QueueResult<QueueStats>;

    /// Fetch a single record
    async fn fetch(&self, id: &JobId) -> QueueResult<Option<JobRecord>>;
}

use std::time::Duration;

/// Configuration for a queue instance.
///
/// Each domain job type gets its own queue over its own table; the table name
/// and entity-id column are identity, the rest is retry/batch policy.
///
/// # Example
///
/// ```rust
/// use jobwell::QueueConfig;
///
/// // Defaults: unlimited retries, 60s base backoff, 3600s cap, batches of 10
/// let config = QueueConfig::new("kb.chunk_embedding_jobs", "chunk_id");
///
/// let config = QueueConfig {
///     max_attempts: 5,
///     ..QueueConfig::new("kb.document_parse_jobs", "document_id")
/// };
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Table (or namespace) holding this queue's job records
    pub table: String,

    /// Column name carrying the business entity id
    pub entity_column: String,

    /// Maximum processing attempts before a failure is terminal.
    ///
    /// `0` means unlimited retries.
    pub max_attempts: u32,

    /// Base delay for the first retry, in seconds
    pub base_retry_delay_secs: u64,

    /// Ceiling on the exponential backoff delay, in seconds
    pub max_retry_delay_secs: u64,

    /// Default number of rows claimed per dequeue
    pub batch_size: usize,
}

impl QueueConfig {
    /// Create a configuration with default retry/batch policy.
    ///
    /// - `max_attempts`: 0 (unlimited)
    /// - `base_retry_delay_secs`: 60
    /// - `max_retry_delay_secs`: 3600
    /// - `batch_size`: 10
    pub fn new(table: impl Into<String>, entity_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            entity_column: entity_column.into(),
            max_attempts: 0,
            base_retry_delay_secs: 60,
            max_retry_delay_secs: 3600,
            batch_size: 10,
        }
    }
}

/// Configuration for a worker bound to one queue.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker name for logs and metrics
    pub name: String,

    /// How long to wait between polls when no jobs are available
    pub poll_interval: Duration,

    /// Random jitter added to the idle sleep, to spread out polls across
    /// workers sharing a storage pool. Zero disables jitter.
    pub jitter: Duration,

    /// Number of jobs claimed per tick (should generally match the queue's)
    pub batch_size: usize,

    /// Age past which a `processing` row counts as abandoned
    pub stale_threshold: Duration,

    /// Run one stale-recovery pass before entering the poll loop
    pub recover_stale_on_start: bool,
}

impl WorkerConfig {
    /// Create a worker configuration with default polling policy.
    ///
    /// - `poll_interval`: 5 seconds
    /// - `jitter`: 0
    /// - `batch_size`: 10
    /// - `stale_threshold`: 10 minutes
    /// - `recover_stale_on_start`: true
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_interval: Duration::from_secs(5),
            jitter: Duration::ZERO,
            batch_size: 10,
            stale_threshold: Duration::from_secs(10 * 60),
            recover_stale_on_start: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_defaults() {
        let config = QueueConfig::new("kb.test_jobs", "object_id");
        assert_eq!(config.table, "kb.test_jobs");
        assert_eq!(config.entity_column, "object_id");
        assert_eq!(config.max_attempts, 0);
        assert_eq!(config.base_retry_delay_secs, 60);
        assert_eq!(config.max_retry_delay_secs, 3600);
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn worker_config_defaults() {
        let config = WorkerConfig::new("embedding-worker");
        assert_eq!(config.name, "embedding-worker");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.jitter, Duration::ZERO);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.stale_threshold, Duration::from_secs(600));
        assert!(config.recover_stale_on_start);
    }
}

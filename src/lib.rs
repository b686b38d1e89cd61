//! # jobwell: a durable polling job queue for background work
//!
//! A generic at-least-once job queue over a durable job table, plus the
//! polling worker that drains it. Every domain job type (chunk embedding
//! backfill, document parsing retries, sync jobs, extraction jobs) is the
//! same machine with a different table and processor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  enqueue   ┌──────────┐  claim/ack   ┌─────────────┐
//! │   Producer    │──────────►│ Queue<S>  │◄────────────│  Worker<S>   │
//! └──────────────┘            └────┬─────┘              └──────┬──────┘
//!                                  │ JobStore                  │ Processor
//!                             ┌────▼─────┐              ┌──────▼──────┐
//!                             │MemoryStore│              │ domain work  │
//!                             └──────────┘              └─────────────┘
//! ```
//!
//! - [`Queue`] owns the policy: enqueue, batched atomic dequeue, idempotent
//!   completion, failure with exponential backoff (or terminal failure once
//!   the attempt budget is spent), stale-claim recovery, and stats.
//! - [`Worker`] owns the loop: poll on an interval, claim a batch, run the
//!   [`Processor`] per job, ack the outcome, and keep going - a panicking or
//!   failing processor never takes the loop down.
//! - [`JobStore`] is the storage seam: anything that can atomically claim N
//!   eligible rows qualifies. [`MemoryStore`] is the in-process reference
//!   backend.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use jobwell::prelude::*;
//!
//! struct EmbedChunk;
//!
//! #[async_trait]
//! impl Processor for EmbedChunk {
//!     async fn process(&self, job: &JobRecord) -> Result<(), JobError> {
//!         // call the embedding API for job.entity_id, write the vector
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), jobwell::QueueError> {
//! let store = Arc::new(MemoryStore::new());
//! let mut service = JobService::new(
//!     store,
//!     QueueConfig::new("kb.chunk_embedding_jobs", "chunk_id"),
//!     WorkerConfig {
//!         poll_interval: Duration::from_millis(10),
//!         ..WorkerConfig::new("embedding-worker")
//!     },
//! );
//!
//! service.enqueue("chunk-123").await?;
//! service.start(EmbedChunk)?;
//!
//! tokio::time::sleep(Duration::from_millis(50)).await;
//! service.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod queue;
pub mod service;
pub mod store;
pub mod types;
pub mod worker;

pub use config::{QueueConfig, WorkerConfig};
pub use error::{JobError, QueueError, QueueResult};
pub use queue::{backoff_delay, DequeueResult, Queue};
pub use service::JobService;
pub use store::{JobStore, MemoryStore};
pub use types::{JobEvent, JobId, JobPriority, JobRecord, JobStatus, QueueStats};
pub use worker::{Processor, Worker, WorkerMetrics};

/// Everything a domain job service needs in one import
pub mod prelude {
    pub use crate::{
        JobError, JobId, JobPriority, JobRecord, JobService, JobStatus, JobStore, MemoryStore,
        Processor, Queue, QueueConfig, QueueError, QueueResult, QueueStats, Worker, WorkerConfig,
        WorkerMetrics,
    };

    pub use async_trait::async_trait;
}

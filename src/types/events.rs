use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobId;

/// Minimal stable event protocol for structured observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobEvent {
    /// Job was enqueued
    Enqueued {
        job_id: JobId,
        entity_id: String,
        at: DateTime<Utc>,
    },

    /// Job was claimed by a worker
    Claimed {
        job_id: JobId,
        attempt: u32,
        at: DateTime<Utc>,
    },

    /// Job completed successfully
    Completed { job_id: JobId, at: DateTime<Utc> },

    /// Job failed and is scheduled for retry
    Retrying {
        job_id: JobId,
        retry_at: DateTime<Utc>,
        error: String,
        at: DateTime<Utc>,
    },

    /// Job failed permanently
    Failed {
        job_id: JobId,
        error: String,
        at: DateTime<Utc>,
    },

    /// Stale claim was returned to pending
    Recovered { job_id: JobId, at: DateTime<Utc> },
}

impl JobEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Claimed { .. } => "claimed",
            Self::Completed { .. } => "completed",
            Self::Retrying { .. } => "retrying",
            Self::Failed { .. } => "failed",
            Self::Recovered { .. } => "recovered",
        }
    }

    /// Get the job ID from any event
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Enqueued { job_id, .. } => job_id,
            Self::Claimed { job_id, .. } => job_id,
            Self::Completed { job_id, .. } => job_id,
            Self::Retrying { job_id, .. } => job_id,
            Self::Failed { job_id, .. } => job_id,
            Self::Recovered { job_id, .. } => job_id,
        }
    }
}

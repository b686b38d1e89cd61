use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobId, JobPriority};

/// Job status lifecycle.
///
/// A closed set with exhaustive transition logic; state-specific data lives on
/// the variant so a completed job cannot carry a retry schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job is waiting to be claimed; not eligible before `next_retry_at`
    Pending { next_retry_at: DateTime<Utc> },

    /// Job is claimed by exactly one worker
    Processing,

    /// Job completed successfully
    Completed { completed_at: DateTime<Utc> },

    /// Job failed permanently (retry budget exhausted or terminal error)
    Failed { failed_at: DateTime<Utc> },

    /// Job was delivered (domain-specific terminal success, e.g. email jobs)
    Sent { sent_at: DateTime<Utc> },
}

impl JobStatus {
    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Sent { .. }
        )
    }

    /// Check if the job is currently being processed
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Check if the job is eligible for claim (pending with retry time reached)
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Pending { next_retry_at } => *next_retry_at <= now,
            _ => false,
        }
    }

    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Processing => "processing",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Sent { .. } => "sent",
        }
    }
}

/// Durable job row - the shape common to every queue table.
///
/// Created by a producer via enqueue, mutated only on behalf of the single
/// worker holding the claim, never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier
    pub id: JobId,

    /// Identifier of the business entity the job operates on
    /// (the column it maps to is per-queue configuration)
    pub entity_id: String,

    /// Current job status
    pub status: JobStatus,

    /// Count of processing attempts so far; incremented on each claim
    pub attempts: u32,

    /// Priority for claim ordering
    pub priority: JobPriority,

    /// Truncated text of the most recent failure
    pub last_error: Option<String>,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new pending record, eligible immediately
    pub fn new(id: JobId, entity_id: String, priority: JobPriority) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_id,
            status: JobStatus::Pending { next_retry_at: now },
            attempts: 0,
            priority,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the record is eligible for claim
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status.is_eligible(now)
    }

    /// Claim the record: flip to processing and record the attempt
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Processing;
        self.attempts += 1;
        self.updated_at = now;
    }

    /// Complete the job successfully
    pub fn complete(&mut self) {
        let now = Utc::now();
        self.status = JobStatus::Completed { completed_at: now };
        self.updated_at = now;
    }

    /// Mark the job as delivered
    pub fn mark_sent(&mut self) {
        let now = Utc::now();
        self.status = JobStatus::Sent { sent_at: now };
        self.updated_at = now;
    }

    /// Requeue for retry at the given time, recording the error
    pub fn schedule_retry(&mut self, retry_at: DateTime<Utc>, error: String) {
        self.status = JobStatus::Pending {
            next_retry_at: retry_at,
        };
        self.last_error = Some(error);
        self.updated_at = Utc::now();
    }

    /// Fail the job permanently
    pub fn fail_terminal(&mut self, error: String) {
        let now = Utc::now();
        self.status = JobStatus::Failed { failed_at: now };
        self.last_error = Some(error);
        self.updated_at = now;
    }

    /// Return an abandoned claim to the pending state.
    ///
    /// Attempts are left untouched - the stuck attempt still counts.
    pub fn reset_to_pending(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Pending { next_retry_at: now };
        self.updated_at = now;
    }
}

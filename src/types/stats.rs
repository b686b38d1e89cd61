use serde::{Deserialize, Serialize};

/// Aggregate row counts per status, for admin/observability tooling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub sent: u64,
}

impl QueueStats {
    /// Total rows across all statuses
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed + self.sent
    }

    /// Rows that are settled and will never run again
    pub fn terminal(&self) -> u64 {
        self.completed + self.failed + self.sent
    }
}

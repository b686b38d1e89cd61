use serde::{Deserialize, Serialize};

/// Job priority levels for claim ordering (higher values claimed first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobPriority {
    /// Low priority jobs (claimed last)
    Low = 1,

    /// Normal priority jobs (default)
    Normal = 2,

    /// High priority jobs (claimed first)
    High = 3,
}

// Claim ordering: (Reverse(priority), created_at) - higher priority first,
// oldest first within the same priority.

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl JobPriority {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for JobPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Storage failure: {0}")]
    Persistence(String),

    #[error("Worker is already running")]
    WorkerAlreadyRunning,

    #[error("Worker is not running")]
    WorkerNotRunning,

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Job execution outcome - determines retry behavior
#[derive(Error, Debug, Clone)]
pub enum JobError {
    /// Transient error - will schedule a backoff retry if attempts remain
    #[error("Transient error: {0}")]
    Transient(String),

    /// Terminal error - fail immediately, no retry
    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl JobError {
    /// Create a transient (retryable) error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a terminal (non-retryable) error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(msg) | Self::Terminal(msg) => msg,
        }
    }
}

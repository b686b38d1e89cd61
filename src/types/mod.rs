pub mod events;
pub mod ids;
pub mod priority;
pub mod record;
pub mod stats;

pub use events::JobEvent;
pub use ids::JobId;
pub use priority::JobPriority;
pub use record::{JobRecord, JobStatus};
pub use stats::QueueStats;

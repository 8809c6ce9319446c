//! Background analysis job entities.

pub mod kind;
pub mod model;
pub mod payload;
pub mod queue_entry;
pub mod stats;
pub mod status;

pub use kind::JobType;
pub use model::{CreateJob, Job};
pub use payload::{AnalysisPayload, AnalysisProvider};
pub use queue_entry::QueueEntry;
pub use stats::{JobStatusCounts, QueueCounts, QueueStats};
pub use status::JobStatus;

//! Stream event types and the bus envelope.

pub mod envelope;
pub mod types;

pub use envelope::ChannelEnvelope;
pub use types::{AnalysisCompleteEvent, JobUpdateEvent, NotificationEvent, StreamEvent};

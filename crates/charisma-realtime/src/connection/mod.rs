//! Stream sessions: lifecycle, heartbeat, and the open-session registry.

pub mod heartbeat;
pub mod registry;
pub mod session;

pub use registry::{RegistrySnapshot, SessionInfo, SessionStats, StreamRegistry};
pub use session::{SessionState, StreamHub, StreamSession};

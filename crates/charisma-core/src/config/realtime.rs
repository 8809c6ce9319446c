//! Stream endpoint configuration.

use serde::{Deserialize, Serialize};

/// Server-sent event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Heartbeat interval in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Buffer size of in-process broadcast channels and per-session queues.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
            channel_buffer_size: default_channel_buffer(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_channel_buffer() -> usize {
    256
}

//! Queue adapter configuration.

use serde::{Deserialize, Serialize};

/// Tuning for the queue adapter and its retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum pending jobs moved into the queue per drain.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Seconds a job may stay in `processing` before it is considered stuck.
    #[serde(default = "default_stuck_timeout")]
    pub stuck_timeout_seconds: u64,
    /// Base retry delay in seconds, doubled per previous attempt.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_seconds: u64,
    /// Upper bound on the retry delay in seconds.
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_seconds: u64,
    /// Maximum retries assigned to newly created jobs.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            stuck_timeout_seconds: default_stuck_timeout(),
            retry_base_delay_seconds: default_retry_base_delay(),
            retry_max_delay_seconds: default_retry_max_delay(),
            default_max_retries: default_max_retries(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_stuck_timeout() -> u64 {
    600
}

fn default_retry_base_delay() -> u64 {
    30
}

fn default_retry_max_delay() -> u64 {
    1800
}

fn default_max_retries() -> i32 {
    3
}

//! Cron drainer configuration.

use serde::{Deserialize, Serialize};

/// Settings for the periodic drain entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    /// Shared secret expected as the bearer token on the cron endpoint.
    #[serde(default)]
    pub secret: String,
    /// Cron expression for the in-process scheduler (seconds field included).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Run the drainer inside this process instead of relying on an
    /// external platform hitting the HTTP entry.
    #[serde(default)]
    pub in_process: bool,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            schedule: default_schedule(),
            in_process: false,
        }
    }
}

fn default_schedule() -> String {
    "0 * * * * *".to_string()
}

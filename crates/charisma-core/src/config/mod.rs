//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! `config/default.toml`, an environment overlay, and `CHARISMA__*`
//! environment variables. Each sub-module represents one section.

pub mod app;
pub mod auth;
pub mod cache;
pub mod cron;
pub mod database;
pub mod logging;
pub mod queue;
pub mod realtime;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::auth::AuthConfig;
use self::cache::CacheConfig;
use self::cron::CronConfig;
use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::queue::QueueConfig;
use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job/notification store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache, queue, and pub/sub backend settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Queue adapter tuning.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Cron drainer settings.
    #[serde(default)]
    pub cron: CronConfig,
    /// Stream endpoint settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Bearer token validation settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Later sources win: `config/default.toml`, then `config/{env}.toml`,
    /// then variables such as `CHARISMA__CRON__SECRET`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CHARISMA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject combinations that cannot run.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.queue.batch_size == 0 {
            return Err(AppError::configuration("queue.batch_size must be at least 1"));
        }
        if self.realtime.heartbeat_interval_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.heartbeat_interval_seconds must be at least 1",
            ));
        }
        if self.database.provider == "postgres" && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required for the postgres provider",
            ));
        }
        if self.cache.memory.max_capacity == 0 {
            return Err(AppError::configuration("cache.memory.max_capacity must be at least 1"));
        }
        Ok(())
    }
}

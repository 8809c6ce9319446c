//! Store selection from configuration.

use std::sync::Arc;

use tracing::info;

use charisma_core::config::database::DatabaseConfig;
use charisma_core::error::AppError;
use charisma_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::{MemoryJobStore, MemoryNotificationStore};
use crate::migration::run_migrations;
use crate::repositories::{JobRepository, NotificationRepository};
use crate::store::{JobStore, NotificationStore};

/// The job and notification stores chosen by `database.provider`.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Job store.
    pub jobs: Arc<dyn JobStore>,
    /// Notification store.
    pub notifications: Arc<dyn NotificationStore>,
    /// The PostgreSQL pool when running against PostgreSQL.
    pub pool: Option<DatabasePool>,
}

impl Stores {
    /// Connect to the configured backend, applying migrations when enabled.
    pub async fn from_config(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider.as_str() {
            "postgres" => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self {
                    jobs: Arc::new(JobRepository::new(pool.pool().clone())),
                    notifications: Arc::new(NotificationRepository::new(pool.pool().clone())),
                    pool: Some(pool),
                })
            }
            "memory" => {
                info!("Using in-memory job and notification stores");
                Ok(Self::in_memory())
            }
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'. Expected 'postgres' or 'memory'"
            ))),
        }
    }

    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            jobs: Arc::new(MemoryJobStore::new()),
            notifications: Arc::new(MemoryNotificationStore::new()),
            pool: None,
        }
    }

    /// Name of the active backend.
    pub fn provider_name(&self) -> &'static str {
        if self.pool.is_some() { "postgres" } else { "memory" }
    }
}

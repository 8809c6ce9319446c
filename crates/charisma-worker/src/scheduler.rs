//! In-process cron scheduler for the drainer.
//!
//! Used when `cron.in_process = true`. Otherwise an external platform
//! triggers the HTTP cron entry on the same schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use charisma_core::error::AppError;

use crate::drainer::CronDrainer;

/// Owns the scheduler; constructed by the process entry point.
pub struct CronScheduler {
    scheduler: JobScheduler,
    drainer: Arc<CronDrainer>,
    schedule: String,
    /// Set while a drain pass runs; overlapping ticks are skipped.
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl CronScheduler {
    /// Create a scheduler that will drain on `schedule` (six-field cron,
    /// seconds first).
    pub async fn new(drainer: Arc<CronDrainer>, schedule: &str) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            drainer,
            schedule: schedule.to_string(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Register the drain task and start ticking.
    pub async fn start(&self) -> Result<(), AppError> {
        self.register_drain().await?;
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!(schedule = %self.schedule, "Cron scheduler started");
        Ok(())
    }

    /// Stop ticking. A pass already running finishes on its own.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    async fn register_drain(&self) -> Result<(), AppError> {
        let drainer = Arc::clone(&self.drainer);
        let running = Arc::clone(&self.running);
        let job = CronJob::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let drainer = Arc::clone(&drainer);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if running.swap(true, Ordering::AcqRel) {
                    tracing::debug!("Previous drain still running, skipping tick");
                    return;
                }
                match drainer.drain().await {
                    Ok(report) => tracing::debug!(
                        processed = report.processed,
                        "Scheduled drain finished"
                    ),
                    Err(e) => tracing::error!(error = %e, "Scheduled drain failed"),
                }
                running.store(false, Ordering::Release);
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid cron schedule '{}': {e}",
                self.schedule
            ))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add drain schedule: {e}")))?;

        tracing::info!(schedule = %self.schedule, "Registered: job drain");
        Ok(())
    }
}

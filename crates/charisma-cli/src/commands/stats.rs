//! Queue and job statistics.

use charisma_core::config::AppConfig;
use charisma_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Execute the stats command
pub async fn execute(config: AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let state = super::connect(config).await?;
    let stats = state.queue.get_stats().await?;

    match format {
        OutputFormat::Json => output::print_json(&stats),
        OutputFormat::Table => {
            println!("Queue:");
            output::print_kv("Pending", stats.queue.pending);
            output::print_kv("Processing", stats.queue.processing);
            output::print_kv("Retrying", stats.queue.retrying);
            println!("Jobs:");
            output::print_kv("Pending", stats.jobs.pending);
            output::print_kv("Queued", stats.jobs.queued);
            output::print_kv("Processing", stats.jobs.processing);
            output::print_kv("Completed", stats.jobs.completed);
            output::print_kv("Failed", stats.jobs.failed);
            output::print_kv("Canceled", stats.jobs.canceled);
        }
    }
    Ok(())
}

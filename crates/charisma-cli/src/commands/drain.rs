//! One drain pass from the command line.
//!
//! Useful where no scheduler can reach the HTTP entry: a host crontab can
//! run `charisma drain` every minute instead.

use serde::Serialize;
use tabled::Tabled;

use charisma_core::config::AppConfig;
use charisma_core::error::AppError;
use charisma_worker::{DrainReport, JobOutcome};

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Job")]
    job_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&JobOutcome> for OutcomeRow {
    fn from(outcome: &JobOutcome) -> Self {
        let status = serde_json::to_value(&outcome.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            job_id: outcome.job_id.to_string(),
            status,
            message: outcome.message.clone().unwrap_or_default(),
        }
    }
}

/// Execute the drain command
pub async fn execute(config: AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let state = super::connect(config).await?;
    let report = state.drainer.drain().await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &DrainReport) {
    output::print_kv("Processed", report.processed);
    output::print_kv("Failed", report.failed());
    output::print_kv("Retries re-queued", report.retries_requeued);
    output::print_kv("Stuck jobs failed", report.stuck_failed);
    output::print_kv("Duration", format!("{} ms", report.duration_ms));
    println!();

    let rows: Vec<OutcomeRow> = report.results.iter().map(OutcomeRow::from).collect();
    output::print_list(&rows, OutputFormat::Table);

    for error in &report.errors {
        output::print_warning(error);
    }
    if report.failed() == 0 {
        output::print_success("Drain pass finished.");
    }
}

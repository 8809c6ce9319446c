//! Background job plumbing for CharismaAI.
//!
//! This crate provides:
//! - [`QueueAdapter`]: moves job references through the queue store and
//!   keeps the job store's status in step (enqueue, claim, complete, fail,
//!   retries, stuck-job cleanup)
//! - [`CronDrainer`]: the periodic pass that feeds pending jobs into the queue
//! - [`CronScheduler`]: runs the drainer in-process on a cron expression

pub mod drainer;
pub mod queue;
pub mod scheduler;

pub use drainer::{CronDrainer, DrainReport, JobOutcome};
pub use queue::{EnqueueOutcome, QueueAdapter, RetryPolicy};
pub use scheduler::CronScheduler;

//! In-process store implementations.
//!
//! Used when `database.provider = "memory"` and as test doubles. State
//! lives behind `tokio::sync::RwLock`; every status change re-checks the
//! source status under the write lock, mirroring the conditional updates
//! of the PostgreSQL repositories.

pub mod job;
pub mod notification;

use std::sync::atomic::{AtomicBool, Ordering};

use charisma_core::error::AppError;
use charisma_core::result::AppResult;

pub use job::MemoryJobStore;
pub use notification::MemoryNotificationStore;

/// Toggle used to simulate an unreachable backend.
#[derive(Debug)]
struct Availability(AtomicBool);

impl Default for Availability {
    fn default() -> Self {
        Self(AtomicBool::new(true))
    }
}

impl Availability {
    fn set(&self, available: bool) {
        self.0.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::service_unavailable("Database is not reachable"))
        }
    }
}

//! Admin-only handlers.

pub mod jobs;

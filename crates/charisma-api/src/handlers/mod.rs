//! Route handlers organized by domain.

pub mod admin;
pub mod cron;
pub mod health;
pub mod notification;
pub mod stream;

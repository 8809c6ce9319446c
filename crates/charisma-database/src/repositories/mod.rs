//! PostgreSQL implementations of the store traits.

pub mod job;
pub mod notification;

pub use job::JobRepository;
pub use notification::NotificationRepository;

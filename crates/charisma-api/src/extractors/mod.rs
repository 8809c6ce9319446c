//! Custom Axum extractors.

pub mod auth;
pub mod query;

pub use auth::{AuthUser, StreamAuth};
pub use query::NotificationQuery;

//! # charisma-database
//!
//! Persistence for jobs and notifications. The [`store`] traits are the
//! seam the rest of the service depends on; [`repositories`] implements
//! them over PostgreSQL and [`memory`] implements them in-process for
//! single-node deployments and tests.

pub mod backend;
pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use backend::Stores;
pub use connection::DatabasePool;
pub use store::{JobStore, NotificationStore};

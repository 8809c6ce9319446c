//! # charisma-core
//!
//! Core crate for the CharismaAI job and notification service. Contains
//! configuration schemas, typed identifiers, the cache provider trait,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Charisma crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

//! # charisma-api
//!
//! HTTP API layer for the CharismaAI job and notification core, built on
//! Axum.
//!
//! Provides the cron drain entry, notification endpoints, the server-sent
//! event stream, health checks, the error-to-response mapping, and the
//! middleware stack (request logging, CORS, tracing).

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

//! # charisma-entity
//!
//! Domain entity models for the CharismaAI job and notification core.
//! Database entities derive `sqlx::FromRow`; enums stored in PostgreSQL
//! derive `sqlx::Type` against the enum types created by the migrations.

pub mod job;
pub mod notification;
pub mod user;

//! # charisma-auth
//!
//! Caller verification for the CharismaAI job and notification core.
//!
//! ## Modules
//!
//! - `jwt`: validation (and, for tooling and tests, issuance) of the
//!   HS256 session tokens minted by the surrounding product
//! - `cron`: shared-secret check guarding the cron drain entry

pub mod cron;
pub mod jwt;

pub use cron::CronSecretVerifier;
pub use jwt::{Claims, JwtDecoder, JwtEncoder};

//! Core type definitions used across the Charisma workspace.

pub mod id;

pub use id::*;

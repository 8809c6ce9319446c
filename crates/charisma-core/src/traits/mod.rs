//! Core traits defined in `charisma-core` and implemented by other crates.

pub mod cache;

pub use cache::CacheProvider;

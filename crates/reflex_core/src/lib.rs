//! Reflex Core
//!
//! Contains the reactive entity store:
//! - Component schema and archetype grouping
//! - Listener batches with synchronous, reentrant notification
//! - Live views, singleton accessors and change trackers
//! - Store configuration

pub mod config;
pub mod ecs;

pub use config::StoreConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

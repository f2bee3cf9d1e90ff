//! Data models for rowscan.
//!
//! This module re-exports all model types used throughout the crate.

pub mod profile;
pub mod query;

// Re-export commonly used types
pub use profile::{ConnectTarget, ConnectionProfile, DEFAULT_HOST, PoolLimits};
pub use query::QueryParam;

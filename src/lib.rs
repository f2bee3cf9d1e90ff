//! rowscan
//!
//! A small MySQL access layer: named connection profiles, lazy and
//! self-repairing connections, parameterized queries, and scanning of result
//! rows into plain structs by column name.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;

pub use config::RegistrySettings;
pub use db::{Database, Record};
pub use error::{DbError, DbResult};
pub use registry::Registry;

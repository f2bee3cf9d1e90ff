//! Database access layer.
//!
//! This module provides:
//! - The record contract and the `record!` macro
//! - Column-to-field mapping with a shared cache
//! - Row scanning from forward-only cursors
//! - Connection management, retry and the query facade
//! - The driver seam and its MySQL implementation

pub mod cursor;
pub mod database;
pub mod driver;
#[macro_use]
pub mod macros;
pub mod mapping;
pub mod mysql;
pub mod pool;
pub mod record;
pub mod retry;
pub mod scanner;
pub mod value;

pub use cursor::{MemoryCursor, RowCursor};
pub use database::Database;
pub use driver::{Driver, DriverHandle};
pub use mapping::{FieldDef, FieldMapping, MappingCache, lower_camel};
pub use mysql::MySqlDriver;
pub use pool::ConnectionManager;
pub use record::{FieldError, Record, set_field};
pub use retry::RetryPolicy;
pub use scanner::{scan_all, scan_one};
pub use value::{ConversionError, FromValue, Value};

//! Driver seam.
//!
//! The connection manager opens pools through a [`Driver`] and the query
//! facade talks to the resulting [`DriverHandle`]. The MySQL implementation
//! lives in [`crate::db::mysql`]; tests plug in scripted drivers.

use crate::db::cursor::RowCursor;
use crate::error::DbResult;
use crate::models::{ConnectTarget, PoolLimits, QueryParam};
use async_trait::async_trait;
use std::sync::Arc;

/// Opens connection pools.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a pool for `target`, sized by `limits`.
    async fn open(
        &self,
        target: &ConnectTarget,
        limits: PoolLimits,
    ) -> DbResult<Arc<dyn DriverHandle>>;
}

/// An open connection pool.
#[async_trait]
pub trait DriverHandle: Send + Sync {
    /// Run a row-returning statement.
    ///
    /// With `max_rows` set, the driver stops reading after that many rows and
    /// the cursor yields at most that many.
    async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
        max_rows: Option<usize>,
    ) -> DbResult<Box<dyn RowCursor + Send>>;

    /// Run a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<u64>;

    /// Close the pool. Later calls on this handle fail with the
    /// closed-connection error.
    async fn close(&self) -> DbResult<()>;
}

//! Query facade.
//!
//! [`Database`] is what callers hold for one named profile. Every call goes
//! through the same path: connect lazily, run the driver call under the retry
//! policy, and replace the connection when the driver reports a closed pool.
//! Only the handle the failing attempt ran on is replaced; a task reporting a
//! failure on a handle that was already swapped out reuses the new one.
//!
//! ```no_run
//! use rowscan::{Registry, RegistrySettings, record};
//! use rowscan::models::ConnectionProfile;
//!
//! record! {
//!     #[derive(Debug, Clone, Default)]
//!     pub struct User {
//!         pub id: i64,
//!         pub user_name: String,
//!         pub email: Option<String> => "mail",
//!     }
//! }
//!
//! # async fn run() -> rowscan::DbResult<()> {
//! let registry = Registry::mysql(RegistrySettings::default());
//! let db = registry.register("default", ConnectionProfile::new("127.0.0.1", 3306, "app", "secret", "shop"));
//!
//! let mut user = User::default();
//! db.query_row(&mut user, "SELECT id, user_name AS userName, mail FROM users WHERE id = ?", &[7i64.into()])
//!     .await?;
//!
//! let mut users: Vec<User> = Vec::new();
//! db.query_rows(&mut users, "SELECT id, user_name AS userName FROM users", &[]).await?;
//! # Ok(())
//! # }
//! ```

use crate::db::cursor::RowCursor;
use crate::db::driver::{Driver, DriverHandle};
use crate::db::mapping::MappingCache;
use crate::db::pool::ConnectionManager;
use crate::db::record::Record;
use crate::db::retry::RetryPolicy;
use crate::db::scanner::{scan_all, scan_one};
use crate::error::DbResult;
use crate::models::{ConnectionProfile, QueryParam};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Query entry point for one connection profile.
#[derive(Debug)]
pub struct Database {
    name: String,
    manager: ConnectionManager,
    cache: Arc<MappingCache>,
    retry: RetryPolicy,
}

impl Database {
    pub fn new(
        name: impl Into<String>,
        driver: Arc<dyn Driver>,
        profile: ConnectionProfile,
        cache: Arc<MappingCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            manager: ConnectionManager::new(driver, profile),
            cache,
            retry,
        }
    }

    /// The alias this database was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn cache(&self) -> &Arc<MappingCache> {
        &self.cache
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run a row-returning statement and hand back its cursor.
    ///
    /// The caller owns the cursor and should close it when done.
    pub async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Box<dyn RowCursor + Send>> {
        self.fetch(sql, params, None).await
    }

    /// Run a statement and scan its first row into `dest`.
    ///
    /// Fails with `NoData` when the statement returns no rows. Rows after the
    /// first are never fetched.
    pub async fn query_row<R: Record>(
        &self,
        dest: &mut R,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<()> {
        let mut cursor = self.fetch(sql, params, Some(1)).await?;
        let result = scan_one(&self.cache, dest, cursor.as_mut());
        cursor.close();
        result
    }

    /// Run a statement and append one record per row to `dest`.
    pub async fn query_rows<R: Record + Clone>(
        &self,
        dest: &mut Vec<R>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<()> {
        let mut cursor = self.query(sql, params).await?;
        let result = scan_all(&self.cache, dest, cursor.as_mut());
        cursor.close();
        result
    }

    /// Run a statement that returns no rows. Returns the affected row count.
    pub async fn exec(&self, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        self.call(move |handle| async move { handle.execute(sql, params).await })
            .await
    }

    /// Close the underlying connection. The next call reconnects.
    pub async fn close(&self) {
        self.manager.close().await;
    }

    async fn fetch(
        &self,
        sql: &str,
        params: &[QueryParam],
        max_rows: Option<usize>,
    ) -> DbResult<Box<dyn RowCursor + Send>> {
        self.call(move |handle| async move { handle.query(sql, params, max_rows).await })
            .await
    }

    async fn call<T, F, Fut>(&self, operation: F) -> DbResult<T>
    where
        F: Fn(Arc<dyn DriverHandle>) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        if !self.manager.is_connected() {
            self.retry
                .run(|| self.manager.ensure_connected())
                .await?;
        }

        let operation = &operation;
        self.retry
            .run(|| async move {
                let (handle, handle_id) = match self.manager.current() {
                    Some(current) => current,
                    None => self.manager.ensure_current().await?,
                };

                match operation(handle).await {
                    Err(e) if e.is_connection_closed() => {
                        debug!(database = %self.name, handle_id, "Connection closed, reconnecting");
                        let _ = self.manager.reconnect_if_current(handle_id).await;
                        Err(e)
                    }
                    result => result,
                }
            })
            .await
    }
}

//! MySQL driver.
//!
//! Pools are `sqlx::MySqlPool`s. Result rows are collected into a
//! [`MySqlCursor`] and decoded column by column into [`Value`]s. A row limit
//! stops the fetch early, so single-row lookups never read past the first row.
//!
//! # Type mapping
//!
//! Column types are first classified into a [`TypeCategory`], then decoded
//! with the matching Rust type:
//!
//! | Category          | Decoded as                      |
//! |-------------------|---------------------------------|
//! | `Integer`         | `i64` (`u64` when `UNSIGNED`)   |
//! | `Boolean`         | `bool`                          |
//! | `Float`           | `f64`, falling back to `f32`    |
//! | `Decimal`         | exact text ([`RawDecimal`])     |
//! | `Binary`          | `Vec<u8>`                       |
//! | `Json`            | `serde_json::Value`             |
//! | `Date/Time/...`   | chrono naive types              |
//! | `Text`            | `String`, falling back to bytes |

use crate::db::cursor::RowCursor;
use crate::db::driver::{Driver, DriverHandle};
use crate::db::value::Value;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectTarget, PoolLimits, QueryParam};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::mysql::{
    MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow, MySqlTypeInfo, MySqlValueRef,
};
use sqlx::{Column, Decode, Executor, MySql, MySqlPool, Row, Statement, Type, TypeInfo};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

// =============================================================================
// Driver
// =============================================================================

/// Opens `sqlx` MySQL pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn open(
        &self,
        target: &ConnectTarget,
        limits: PoolLimits,
    ) -> DbResult<Arc<dyn DriverHandle>> {
        let url = target.url()?;
        let options = MySqlConnectOptions::from_str(&url)
            .map_err(|e| {
                DbError::connection(
                    format!("Invalid MySQL connection target: {}", e),
                    "Check the host, port and database fields of the profile",
                )
            })?
            .charset(&target.charset);

        let pool = MySqlPoolOptions::new()
            .max_connections(limits.max_connections_or_default())
            .min_connections(limits.min_connections())
            .acquire_timeout(target.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                DbError::connection(format!("Failed to connect: {}", e), connection_suggestion(&e))
            })?;

        debug!(target_url = %target.masked_url(), "Opened MySQL pool");

        Ok(Arc::new(MySqlHandle {
            pool,
            read_timeout: target.read_timeout,
            acquire_timeout: target.connect_timeout,
        }))
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and accessible".to_string();
    }

    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify the user and pass fields of the profile".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify the profile: host, port, user, pass and database".to_string()
}

// =============================================================================
// Handle
// =============================================================================

/// An open MySQL pool with a per-call read timeout.
#[derive(Debug)]
pub struct MySqlHandle {
    pool: MySqlPool,
    read_timeout: Duration,
    acquire_timeout: Duration,
}

impl MySqlHandle {
    /// Column names of `sql` without running it. Used when a query returns no
    /// rows to report its columns.
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        match timeout(self.read_timeout, self.pool.prepare(sql)).await {
            Ok(Ok(statement)) => statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Ok(Err(e)) => {
                debug!(error = %e, "Could not describe result columns");
                Vec::new()
            }
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl DriverHandle for MySqlHandle {
    async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
        max_rows: Option<usize>,
    ) -> DbResult<Box<dyn RowCursor + Send>> {
        // When params is empty, use raw SQL to avoid prepared statement issues
        let stream = if params.is_empty() {
            self.pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            query.fetch(&self.pool)
        };

        // Dropping the stream after the limit stops reading further rows
        let rows_future = stream
            .take(max_rows.unwrap_or(usize::MAX))
            .try_collect::<Vec<_>>();

        let rows = match timeout(self.read_timeout, rows_future).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => return Err(driver_error(e, self.acquire_timeout)),
            Err(_) => return Err(timeout_error("query execution", self.read_timeout)),
        };

        if rows.is_empty() && max_rows.is_none() {
            let columns = self.describe_columns(sql).await;
            return Ok(Box::new(MySqlCursor::empty(columns)));
        }

        Ok(Box::new(MySqlCursor::new(rows)))
    }

    async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        // Some statements (e.g. CREATE PROCEDURE) cannot be prepared
        let result = if params.is_empty() {
            timeout(self.read_timeout, self.pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            timeout(self.read_timeout, query.execute(&self.pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(driver_error(e, self.acquire_timeout)),
            Err(_) => Err(timeout_error("write operation", self.read_timeout)),
        }
    }

    async fn close(&self) -> DbResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs())
}

/// Map a driver error, reporting pool acquire timeouts with the timeout the
/// pool was built with.
fn driver_error(error: sqlx::Error, acquire_timeout: Duration) -> DbError {
    match error {
        sqlx::Error::PoolTimedOut => timeout_error("connection pool acquire", acquire_timeout),
        other => DbError::from(other),
    }
}

/// Bind a parameter to a MySQL query.
fn bind_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Cursor over rows returned by a MySQL query.
pub struct MySqlCursor {
    columns: Vec<String>,
    rows: Vec<MySqlRow>,
    current: Option<usize>,
    closed: bool,
}

impl MySqlCursor {
    pub fn new(rows: Vec<MySqlRow>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        Self {
            columns,
            rows,
            current: None,
            closed: false,
        }
    }

    /// A cursor with known columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            current: None,
            closed: false,
        }
    }
}

impl RowCursor for MySqlCursor {
    fn columns(&self) -> DbResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> DbResult<bool> {
        if self.closed {
            return Ok(false);
        }
        let next = self.current.map_or(0, |i| i + 1);
        self.current = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn value(&self, index: usize) -> DbResult<Value> {
        let row = self
            .current
            .and_then(|i| self.rows.get(i))
            .ok_or_else(|| DbError::scan(index.to_string(), "no current row"))?;
        let column = row
            .columns()
            .get(index)
            .ok_or_else(|| DbError::scan(index.to_string(), "column index out of bounds"))?;

        let type_name = column.type_info().name();
        decode_column(row, index, type_name, categorize_type(type_name))
            .map_err(|e| DbError::scan(column.name(), e.to_string()))
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    UnsignedInteger,
    Boolean,
    Float,
    Decimal,
    Binary,
    Json,
    Date,
    Time,
    DateTime,
    Text,
}

/// Classify a MySQL type name (as reported by `sqlx`) into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();
    let unsigned = lower.contains("unsigned");
    let base = lower.split_whitespace().next().unwrap_or("");

    match base {
        "decimal" | "numeric" => TypeCategory::Decimal,
        "bool" | "boolean" => TypeCategory::Boolean,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" if unsigned => {
            TypeCategory::UnsignedInteger
        }
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
            TypeCategory::Integer
        }
        "float" | "double" | "real" => TypeCategory::Float,
        "json" => TypeCategory::Json,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "datetime" | "timestamp" => TypeCategory::DateTime,
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
            TypeCategory::Binary
        }
        // varchar, char, text, enum, set and anything unrecognized
        _ => TypeCategory::Text,
    }
}

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

fn decode_column(
    row: &MySqlRow,
    idx: usize,
    type_name: &str,
    category: TypeCategory,
) -> Result<Value, sqlx::Error> {
    let value = match category {
        TypeCategory::Integer => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
        TypeCategory::UnsignedInteger => row.try_get::<Option<u64>, _>(idx)?.map(Value::UInt),
        TypeCategory::Boolean => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        TypeCategory::Float => match row.try_get::<Option<f64>, _>(idx) {
            Ok(v) => v.map(Value::Float),
            Err(_) => row
                .try_get::<Option<f32>, _>(idx)?
                .map(|v| Value::Float(v.into())),
        },
        TypeCategory::Decimal => row
            .try_get::<Option<RawDecimal>, _>(idx)?
            .map(|v| Value::Decimal(v.0)),
        TypeCategory::Binary => row.try_get::<Option<Vec<u8>>, _>(idx)?.map(Value::Bytes),
        TypeCategory::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)?
            .map(Value::Json),
        TypeCategory::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(Value::Date),
        TypeCategory::Time => row
            .try_get::<Option<chrono::NaiveTime>, _>(idx)?
            .map(Value::Time),
        TypeCategory::DateTime => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(Value::DateTime),
        TypeCategory::Text => match row.try_get::<Option<String>, _>(idx) {
            Ok(v) => v.map(Value::Text),
            Err(e) => {
                debug!(type_name = %type_name, error = %e, "Falling back to raw bytes");
                row.try_get::<Option<Vec<u8>>, _>(idx)?.map(Value::Bytes)
            }
        },
    };

    Ok(value.unwrap_or(Value::Null))
}

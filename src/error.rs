//! Error types for rowscan.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Connection-level variants carry a suggestion so callers can surface an
//! actionable hint next to the driver message.

use thiserror::Error;

/// Message carried by the connection error produced when a query hits a closed pool.
///
/// The query facade compares error messages against this exact text to decide
/// whether a reconnect is worth attempting.
pub const CONNECTION_CLOSED_MESSAGE: &str = "Connection pool is closed";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Invalid destination: {message}")]
    InvalidDestination { message: String },

    #[error("Empty return: query produced no rows")]
    NoData,

    #[error("Scan failed on column '{column}': {message}")]
    Scan { column: String, message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Connection profile not found: {alias}")]
    ProfileNotFound { alias: String },

    #[error("Cannot load profiles from config file: registry has already been initialized")]
    AlreadyInitialized,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// The error a driver reports when a query is issued against a closed pool.
    pub fn connection_closed() -> Self {
        Self::connection(CONNECTION_CLOSED_MESSAGE, "Reconnect to the database")
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid destination error.
    pub fn invalid_destination(message: impl Into<String>) -> Self {
        Self::InvalidDestination {
            message: message.into(),
        }
    }

    /// Create a scan error for the given column.
    pub fn scan(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a profile not found error.
    pub fn profile_not_found(alias: impl Into<String>) -> Self {
        Self::ProfileNotFound {
            alias: alias.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check whether this error says the underlying connection pool is closed.
    ///
    /// Matching is done on the message text only; no other failure triggers a
    /// reconnect.
    pub fn is_connection_closed(&self) -> bool {
        match self {
            Self::Connection { message, .. } => message == CONNECTION_CLOSED_MESSAGE,
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection profile fields and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::NoData,
            // The acquire timeout is not known here; the MySQL handle maps this
            // variant itself with the timeout its pool was built with
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out acquiring a pooled connection",
                "Raise the profile timeout or maxOpen",
            ),
            sqlx::Error::PoolClosed => DbError::connection_closed(),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::internal(format!("Type not found: {}", type_name))
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::scan(col.to_string(), "column not found in result set")
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::scan(index, format!("failed to decode: {}", source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::config(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42000".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert_eq!(DbError::NoData.suggestion(), None);
    }

    #[test]
    fn test_pool_timeout_has_no_invented_duration() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(!err.is_connection_closed());
        assert!(!err.to_string().contains("30s"));
    }

    #[test]
    fn test_timeout_display_keeps_full_seconds() {
        let err = DbError::timeout("query execution", 5_000_000_000);
        assert!(err.to_string().contains("exceeded 5000000000s"));
    }

    #[test]
    fn test_pool_closed_maps_to_closed_signature() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_connection_closed());
    }

    #[test]
    fn test_closed_signature_is_exact_message_match() {
        assert!(DbError::connection_closed().is_connection_closed());
        assert!(!DbError::connection("Connection pool is closed!", "x").is_connection_closed());
        assert!(!DbError::connection("I/O error: broken pipe", "x").is_connection_closed());
        assert!(
            !DbError::database(CONNECTION_CLOSED_MESSAGE, None, "x").is_connection_closed()
        );
    }

    #[test]
    fn test_row_not_found_maps_to_no_data() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NoData));
    }

    #[test]
    fn test_scan_error_names_column() {
        let err = DbError::scan("userName", "expected text, got int");
        let msg = err.to_string();
        assert!(msg.contains("userName"));
        assert!(msg.contains("expected text"));
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: DbError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, DbError::Config { .. }));
    }
}

//! Connection profile models.
//!
//! This module defines the per-database connection parameters and the
//! driver-facing values derived from them.

use crate::config::{
    DEFAULT_CHARSET, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT,
    DEFAULT_READ_TIMEOUT_SECS,
};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Host used when a profile leaves `host` empty.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Connection parameters for one logical database.
///
/// Zero or empty fields mean "unset"; [`ConnectionProfile::apply_defaults`]
/// fills them in at the first connection attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionProfile {
    pub host: String,
    /// Default: 3301
    pub port: u16,
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub pass: String,
    /// Default: utf8mb4
    pub charset: String,
    pub database: String,
    #[serde(rename = "maxIdle")]
    pub max_idle: u32,
    #[serde(rename = "maxOpen")]
    pub max_open: u32,
    /// Connect timeout in seconds (default: 30)
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
    /// Read timeout in seconds (default: 300)
    #[serde(rename = "readTimeout")]
    pub read_timeout_secs: u64,
}

impl ConnectionProfile {
    /// Create a profile for the given server and database.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        pass: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            pass: pass.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Set the pool limits.
    pub fn with_pool(mut self, max_idle: u32, max_open: u32) -> Self {
        self.max_idle = max_idle;
        self.max_open = max_open;
        self
    }

    /// Set the character set.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the connect and read timeouts in seconds.
    pub fn with_timeouts(mut self, timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }

    /// Fill unset fields with their defaults. Fields already set are kept, so
    /// calling this more than once has no further effect.
    pub fn apply_defaults(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = DEFAULT_CONNECT_TIMEOUT_SECS;
        }
        if self.read_timeout_secs == 0 {
            self.read_timeout_secs = DEFAULT_READ_TIMEOUT_SECS;
        }
        if self.charset.is_empty() {
            self.charset = DEFAULT_CHARSET.to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
    }

    /// Build the driver connect target from this profile.
    pub fn connect_target(&self) -> ConnectTarget {
        ConnectTarget {
            user: self.user.clone(),
            password: self.pass.clone(),
            host: if self.host.is_empty() {
                DEFAULT_HOST.to_string()
            } else {
                self.host.clone()
            },
            port: self.port,
            database: self.database.clone(),
            connect_timeout: Duration::from_secs(self.timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            charset: self.charset.clone(),
        }
    }

    /// Pool sizing taken from this profile.
    pub fn pool_limits(&self) -> PoolLimits {
        PoolLimits {
            max_idle: self.max_idle,
            max_open: self.max_open,
        }
    }
}

/// Everything a driver needs to open a connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub charset: String,
}

impl ConnectTarget {
    /// Render the target as a `mysql://` connection URL.
    pub fn url(&self) -> DbResult<String> {
        let invalid = |what: &str| {
            DbError::connection(
                format!("Invalid {} in connection profile", what),
                "Check the host, user and password fields of the profile",
            )
        };

        let mut url = Url::parse("mysql://localhost").map_err(|_| invalid("URL"))?;
        url.set_host(Some(&self.host)).map_err(|_| invalid("host"))?;
        url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("password"))?;
        }
        url.set_path(&format!("/{}", self.database));
        url.query_pairs_mut().append_pair("charset", &self.charset);

        Ok(url.to_string())
    }

    /// Get a display-safe version of the connection URL (password masked).
    pub fn masked_url(&self) -> String {
        let masked = ConnectTarget {
            password: if self.password.is_empty() {
                String::new()
            } else {
                "****".to_string()
            },
            ..self.clone()
        };
        masked
            .url()
            .unwrap_or_else(|_| format!("mysql://{}:{}/{}", self.host, self.port, self.database))
    }
}

/// Pool sizing passed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolLimits {
    /// Idle connections kept open (0: driver default)
    pub max_idle: u32,
    /// Upper bound on open connections (0: default of 10)
    pub max_open: u32,
}

impl PoolLimits {
    /// Get max_open with default value.
    pub fn max_connections_or_default(&self) -> u32 {
        if self.max_open == 0 {
            DEFAULT_MAX_CONNECTIONS
        } else {
            self.max_open
        }
    }

    /// Idle connections to keep, never more than the pool may open.
    pub fn min_connections(&self) -> u32 {
        self.max_idle.min(self.max_connections_or_default())
    }
}

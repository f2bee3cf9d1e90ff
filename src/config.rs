//! Configuration handling for rowscan.
//!
//! This module holds the connection defaults, the registry-wide settings and
//! the loader for JSON profile files.
//!
//! # Profile file format
//!
//! A profile file is a JSON object keyed by alias:
//!
//! ```text
//! {
//!     "default": { "host": "127.0.0.1", "port": 3306, "user": "app", "pass": "secret",
//!                  "database": "shop", "maxIdle": 2, "maxOpen": 10 },
//!     "report":  { "host": "replica.local", "database": "shop", "readTimeout": 600 }
//! }
//! ```
//!
//! Every profile key is optional; unset fields receive their defaults at the
//! first connection attempt.

use crate::error::{DbError, DbResult};
use crate::models::ConnectionProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 3301;
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Additional attempts made after a failed database call.
pub const DEFAULT_MAX_TRIES: u32 = 1;

/// Settings shared by every profile of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySettings {
    /// Retries after the first failed attempt (default: 1)
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
}

fn default_max_tries() -> u32 {
    DEFAULT_MAX_TRIES
}

impl RegistrySettings {
    /// Settings with a custom retry count.
    pub fn with_max_tries(max_tries: u32) -> Self {
        Self { max_tries }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
        }
    }
}

/// Parse a profile file body into `alias -> profile`.
pub fn parse_profiles(json: &str) -> DbResult<HashMap<String, ConnectionProfile>> {
    let profiles: HashMap<String, ConnectionProfile> = serde_json::from_str(json)?;

    if let Some(alias) = profiles.keys().find(|alias| alias.trim().is_empty()) {
        return Err(DbError::config(format!(
            "Profile alias cannot be empty (got {:?})",
            alias
        )));
    }

    Ok(profiles)
}

/// Read and parse a profile file.
pub fn load_profiles(path: impl AsRef<Path>) -> DbResult<HashMap<String, ConnectionProfile>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|e| {
        DbError::config(format!("Cannot read profile file {}: {}", path.display(), e))
    })?;
    parse_profiles(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RegistrySettings::default();
        assert_eq!(settings.max_tries, 1);
        assert_eq!(RegistrySettings::with_max_tries(4).max_tries, 4);
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: RegistrySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, RegistrySettings::default());

        let settings: RegistrySettings = serde_json::from_str(r#"{"maxTries": 3}"#).unwrap();
        assert_eq!(settings.max_tries, 3);
    }

    #[test]
    fn test_parse_profiles() {
        let profiles = parse_profiles(
            r#"{
                "default": {"host": "db.local", "port": 3306, "user": "app", "pass": "secret",
                            "charset": "utf8", "database": "shop", "maxIdle": 2, "maxOpen": 8,
                            "timeout": 5, "readTimeout": 60},
                "report": {"host": "replica.local"}
            }"#,
        )
        .unwrap();

        assert_eq!(profiles.len(), 2);
        let default = &profiles["default"];
        assert_eq!(default.host, "db.local");
        assert_eq!(default.port, 3306);
        assert_eq!(default.user, "app");
        assert_eq!(default.pass, "secret");
        assert_eq!(default.charset, "utf8");
        assert_eq!(default.database, "shop");
        assert_eq!(default.max_idle, 2);
        assert_eq!(default.max_open, 8);
        assert_eq!(default.timeout_secs, 5);
        assert_eq!(default.read_timeout_secs, 60);

        let report = &profiles["report"];
        assert_eq!(report.host, "replica.local");
        assert_eq!(report.port, 0);
        assert!(report.charset.is_empty());
    }

    #[test]
    fn test_parse_profiles_rejects_bad_json() {
        let result = parse_profiles(r#"{"default": {"port": "not a number"}}"#);
        assert!(matches!(result, Err(DbError::Config { .. })));
    }

    #[test]
    fn test_parse_profiles_rejects_empty_alias() {
        let result = parse_profiles(r#"{" ": {"host": "x"}}"#);
        assert!(matches!(result, Err(DbError::Config { .. })));
    }

    #[test]
    fn test_load_profiles_missing_file() {
        let result = load_profiles("/definitely/not/here/profiles.json");
        let err = result.unwrap_err();
        assert!(matches!(err, DbError::Config { .. }));
        assert!(err.to_string().contains("profiles.json"));
    }
}

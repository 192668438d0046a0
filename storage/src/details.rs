//! # Store Connection Details
//!
//! Connection settings for the remote key-value store, loadable from serde
//! sources or from `SETTINGS_STORE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use validator::Validate;

/// Connection details for the key-value store holding settings blobs.
///
/// ## Fields
/// - `host`: store hostname (default: "localhost")
/// - `port`: store port (default: 6379)
/// - `prefix`: key prefix every settings key lives under (default:
///   "/config/settings")
/// - `timeout_ms`: per-operation timeout (default: 2000, range: 1-60000)
/// - `max_retries`: retries after the first failed attempt (default: 2,
///   range: 0-10)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct StoreDetails {
    #[serde(default = "default_store_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    #[serde(default = "default_store_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[serde(default = "default_store_prefix")]
    #[validate(length(min = 1, max = 512))]
    pub prefix: String,

    #[serde(default = "default_store_timeout_ms")]
    #[validate(range(min = 1, max = 60000))]
    pub timeout_ms: u64,

    #[serde(default = "default_store_max_retries")]
    #[validate(range(max = 10))]
    pub max_retries: usize
}

fn default_store_host() -> String {
    "localhost".to_string()
}

fn default_store_port() -> u16 {
    6379
}

fn default_store_prefix() -> String {
    "/config/settings".to_string()
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_store_max_retries() -> usize {
    2
}

impl Default for StoreDetails {
    fn default() -> Self {
        Self {
            host: default_store_host(),
            port: default_store_port(),
            prefix: default_store_prefix(),
            timeout_ms: default_store_timeout_ms(),
            max_retries: default_store_max_retries()
        }
    }
}

impl StoreDetails {
    pub fn new(host: impl Into<String>, port: u16, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Redis connection URL for these details.
    pub fn connection_url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }

    /// Load store details from environment variables.
    ///
    /// - `SETTINGS_STORE_HOST`
    /// - `SETTINGS_STORE_PORT`
    /// - `SETTINGS_STORE_PREFIX`
    /// - `SETTINGS_STORE_TIMEOUT_MS`
    /// - `SETTINGS_STORE_MAX_RETRIES`
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            host: env::var("SETTINGS_STORE_HOST").unwrap_or_else(|_| default_store_host()),
            port: parse_env("SETTINGS_STORE_PORT").unwrap_or_else(default_store_port),
            prefix: env::var("SETTINGS_STORE_PREFIX").unwrap_or_else(|_| default_store_prefix()),
            timeout_ms: parse_env("SETTINGS_STORE_TIMEOUT_MS")
                .unwrap_or_else(default_store_timeout_ms),
            max_retries: parse_env("SETTINGS_STORE_MAX_RETRIES")
                .unwrap_or_else(default_store_max_retries)
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
                None
            }
        },
        Err(_) => None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_validate() {
        let details = StoreDetails::default();
        assert!(details.validate().is_ok());
        assert_eq!(details.connection_url(), "redis://localhost:6379");
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let details = StoreDetails::new("", 6379, "/config");
        assert!(details.validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let details: StoreDetails =
            serde_json::from_str(r#"{"host": "etcd", "port": 2379, "prefix": "/config/app"}"#)
                .unwrap();
        assert_eq!(details.host, "etcd");
        assert_eq!(details.port, 2379);
        assert_eq!(details.timeout_ms, 2000);
        assert_eq!(details.max_retries, 2);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        unsafe {
            env::set_var("SETTINGS_STORE_HOST", "kv.internal");
            env::set_var("SETTINGS_STORE_PORT", "7000");
            env::set_var("SETTINGS_STORE_TIMEOUT_MS", "not-a-number");
        }

        let details = StoreDetails::from_env();
        assert_eq!(details.host, "kv.internal");
        assert_eq!(details.port, 7000);
        assert_eq!(details.timeout_ms, 2000);

        unsafe {
            env::remove_var("SETTINGS_STORE_HOST");
            env::remove_var("SETTINGS_STORE_PORT");
            env::remove_var("SETTINGS_STORE_TIMEOUT_MS");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        unsafe {
            env::remove_var("SETTINGS_STORE_HOST");
            env::remove_var("SETTINGS_STORE_PREFIX");
        }
        let details = StoreDetails::from_env();
        assert_eq!(details.host, "localhost");
        assert_eq!(details.prefix, "/config/settings");
    }
}

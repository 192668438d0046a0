//! # Proxy Configuration
//!
//! What the settings proxy needs from its surroundings: the active
//! environment, where the store lives, and which request resolver to install.

use context::{DEFAULT_SELECTOR_HEADER, ResolverKind};
use errors::SettingsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::StoreDetails;
use validator::Validate;

use crate::host::HostSettings;

/// Host setting naming the active environment.
pub const ENV_SETTING: &str = "SETTINGS_ENV";
/// Host setting holding the store details mapping (`host`, `port`, `prefix`).
pub const STORE_SETTING: &str = "SETTINGS_STORE";
/// Host setting naming the request resolver strategy.
pub const RESOLVER_SETTING: &str = "SETTINGS_REQUEST_RESOLVER";
/// Host setting with the environment-defaults cache TTL in seconds.
pub const CACHE_TTL_SETTING: &str = "SETTINGS_CACHE_TTL_SECONDS";
/// Host setting overriding the selector header name.
pub const SELECTOR_HEADER_SETTING: &str = "SETTINGS_SELECTOR_HEADER";

/// Settings proxy configuration.
///
/// ## Fields
/// - `env`: active environment name (required)
/// - `store`: key-value store connection details
/// - `request_resolver`: resolver strategy (default: "none")
/// - `cache_ttl_seconds`: env-defaults cache TTL (default: 30; `null` keeps
///   the layer until invalidated, `0` disables caching)
/// - `selector_header`: request header naming the config set (default:
///   "X-Dynamic-Setting")
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProxyConfig {
    #[validate(length(min = 1, max = 255))]
    pub env: String,

    #[serde(default)]
    #[validate(nested)]
    pub store: StoreDetails,

    #[serde(default)]
    pub request_resolver: ResolverKind,

    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: Option<u64>,

    #[serde(default = "default_selector_header")]
    #[validate(length(min = 1, max = 128))]
    pub selector_header: String
}

fn default_cache_ttl_seconds() -> Option<u64> {
    Some(30)
}

fn default_selector_header() -> String {
    DEFAULT_SELECTOR_HEADER.to_string()
}

impl ProxyConfig {
    pub fn new(env: impl Into<String>, store: StoreDetails) -> Self {
        Self {
            env: env.into(),
            store,
            request_resolver: ResolverKind::default(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            selector_header: default_selector_header()
        }
    }

    /// Read the proxy configuration out of the host's static settings.
    ///
    /// `SETTINGS_ENV` is required; every other key falls back to its default.
    pub fn from_host(host: &dyn HostSettings) -> Result<Self, SettingsError> {
        let env = match host.get(ENV_SETTING) {
            Some(Value::String(env)) => env,
            Some(other) => {
                return Err(SettingsError::invalid_config(format!(
                    "{ENV_SETTING} must be a string, got {other}"
                )));
            }
            None => {
                return Err(SettingsError::invalid_config(format!(
                    "{ENV_SETTING} is not set"
                )));
            }
        };

        let store = match host.get(STORE_SETTING) {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                SettingsError::invalid_config(format!("{STORE_SETTING}: {e}"))
            })?,
            None => StoreDetails::default()
        };

        let request_resolver = match host.get(RESOLVER_SETTING) {
            Some(Value::String(name)) => name
                .parse::<ResolverKind>()
                .map_err(|e| SettingsError::invalid_config(format!("{RESOLVER_SETTING}: {e}")))?,
            Some(other) => {
                return Err(SettingsError::invalid_config(format!(
                    "{RESOLVER_SETTING} must be a string, got {other}"
                )));
            }
            None => ResolverKind::default()
        };

        let cache_ttl_seconds = match host.get(CACHE_TTL_SETTING) {
            Some(Value::Null) => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                SettingsError::invalid_config(format!(
                    "{CACHE_TTL_SETTING} must be a non-negative integer, got {value}"
                ))
            })?),
            None => default_cache_ttl_seconds()
        };

        let selector_header = match host.get(SELECTOR_HEADER_SETTING) {
            Some(Value::String(header)) => header,
            Some(other) => {
                return Err(SettingsError::invalid_config(format!(
                    "{SELECTOR_HEADER_SETTING} must be a string, got {other}"
                )));
            }
            None => default_selector_header()
        };

        let config = Self {
            env,
            store,
            request_resolver,
            cache_ttl_seconds,
            selector_header
        };
        config.check()?;
        Ok(config)
    }

    /// Validate, converting validator errors into `InvalidConfig`.
    pub fn check(&self) -> Result<(), SettingsError> {
        self.validate().map_err(SettingsError::invalid_config)
    }
}

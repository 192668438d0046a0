//! # Layered Settings
//!
//! Resolves application settings from three layers into one view:
//!
//! 1. the config set named by the current request (highest priority)
//! 2. environment defaults stored in a key-value store
//! 3. the host process's static settings (lowest priority)
//!
//! This crate provides:
//! - [`ConfigManager`]: administrative writes of environment defaults and
//!   config sets
//! - [`OverwriteLoader`] / [`get_overwrites`]: store reads and deep merge
//! - [`SettingsProxy`]: attribute-style and mapping-style lookups per request
//! - [`HostSettings`] sources (in code, TOML/YAML file, environment variables)
//! - [`global`]: an optional process-wide accessor
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use context::{RequestContext, TaskLocalResolver};
//! use settings::{ConfigManager, OverwriteLoader, SettingsProxy, StaticSettings};
//! use storage::InMemoryKvStore;
//!
//! # async fn run() -> Result<(), errors::SettingsError> {
//! let store = Arc::new(InMemoryKvStore::new());
//! let manager = ConfigManager::new(store.clone(), "/config/app");
//! manager.set_env_defaults("production", &serde_json::json!({"A": 1})).await?;
//! manager.set_config_sets([("foo", serde_json::json!({"A": 11}))]).await?;
//!
//! let proxy = SettingsProxy::builder(
//!     "production",
//!     Arc::new(StaticSettings::new().with("DEBUG", false)),
//!     OverwriteLoader::new(store, "/config/app"),
//! )
//! .resolver(Arc::new(TaskLocalResolver))
//! .build();
//!
//! let ctx = RequestContext::from_headers([("X-Dynamic-Setting", "foo")]);
//! let a = TaskLocalResolver::scope(ctx, proxy.get("A")).await?;
//! assert_eq!(a, 11);
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod codec;
pub mod config;
pub mod global;
pub mod host;
pub mod loader;
pub mod manager;
pub mod merge;
pub mod proxy;

/// A settings mapping: setting name to JSON value.
pub type Mapping = serde_json::Map<String, serde_json::Value>;

pub use cache::{CachePolicy, CacheState, EnvDefaultsCache};
pub use config::ProxyConfig;
pub use errors::SettingsError;
pub use host::{ConfigFileError, HostSettings, StaticSettings};
pub use loader::{OverwriteLoader, get_overwrites};
pub use manager::ConfigManager;
pub use merge::deep_merge;
pub use proxy::{SettingsProxy, SettingsProxyBuilder, SettingsView};
pub use storage::StoreDetails;

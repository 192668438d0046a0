//! # Configuration Manager
//!
//! Administrative write API for environment defaults and config sets.
//!
//! Writes go straight to the store; nothing is cached between calls, so a
//! write is visible to every reader once the store acknowledges it.

use std::collections::BTreeMap;
use std::sync::Arc;

use errors::SettingsError;
use serde::Serialize;
use storage::{KeyLayout, KvStore, StoreDetails};
use tracing::{info, instrument, warn};

use crate::Mapping;
use crate::codec::{decode_mapping, encode_mapping};
use crate::loader::OverwriteLoader;

/// Owns write access to the environment and config set keys.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    loader: OverwriteLoader
}

impl ConfigManager {
    pub fn new(store: Arc<dyn KvStore>, prefix: &str) -> Self {
        Self {
            loader: OverwriteLoader::new(store, prefix)
        }
    }

    pub async fn connect(details: &StoreDetails) -> Result<Self, SettingsError> {
        Ok(Self {
            loader: OverwriteLoader::connect(details).await?
        })
    }

    pub fn layout(&self) -> &KeyLayout {
        self.loader.layout()
    }

    /// A loader reading through the same store client.
    pub fn loader(&self) -> OverwriteLoader {
        self.loader.clone()
    }

    /// Replace the defaults blob of `env` with `mapping`.
    ///
    /// `mapping` must serialize to a JSON object; anything else is rejected
    /// with `InvalidValue` before the store is touched.
    #[instrument(skip(self, mapping))]
    pub async fn set_env_defaults<T: Serialize + ?Sized>(
        &self,
        env: &str,
        mapping: &T
    ) -> Result<(), SettingsError> {
        validate_name("env", env)?;
        let key = self.layout().env_key(env);
        let encoded = encode_mapping(&key, mapping)?;

        self.loader.store().put(&key, &encoded).await?;
        info!(env, "Environment defaults written");
        Ok(())
    }

    /// Write every config set in `sets`, replacing prior values by name.
    ///
    /// Each name is written independently, in name order. A failure on one
    /// name does not stop the others; the call then fails with
    /// `PartialWrite` listing every name that was not written.
    #[instrument(skip(self, sets))]
    pub async fn set_config_sets<K, T, I>(&self, sets: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Serialize
    {
        let ordered: BTreeMap<String, T> = sets.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut failed = Vec::new();

        for (name, mapping) in &ordered {
            if let Err(e) = self.write_config_set(name, mapping).await {
                warn!(config_set = %name, error = %e, "Failed to write config set");
                failed.push(name.clone());
            }
        }

        if failed.is_empty() {
            info!(count = ordered.len(), "Config sets written");
            Ok(())
        } else {
            Err(SettingsError::PartialWrite { failed })
        }
    }

    async fn write_config_set<T: Serialize + ?Sized>(
        &self,
        name: &str,
        mapping: &T
    ) -> Result<(), SettingsError> {
        validate_name("config set", name)?;
        let key = self.layout().config_set_key(name);
        let encoded = encode_mapping(&key, mapping)?;
        self.loader.store().put(&key, &encoded).await?;
        Ok(())
    }

    pub async fn get_env_defaults(&self, env: &str) -> Result<Mapping, SettingsError> {
        self.loader.load_env_defaults(env).await
    }

    pub async fn get_config_set(&self, name: &str) -> Result<Option<Mapping>, SettingsError> {
        self.loader.find_config_set(name).await
    }

    /// Every stored config set, keyed by name.
    pub async fn get_config_sets(&self) -> Result<BTreeMap<String, Mapping>, SettingsError> {
        let prefix = self.layout().config_sets_prefix();
        let listed = self.loader.store().list(&prefix).await?;

        let mut sets = BTreeMap::new();
        for (key, raw) in listed {
            let Some(name) = self.layout().config_set_name(&key) else {
                continue;
            };
            sets.insert(name.to_string(), decode_mapping(&key, &raw)?);
        }
        Ok(sets)
    }
}

fn validate_name(what: &str, name: &str) -> Result<(), SettingsError> {
    if name.trim().is_empty() || name.contains('/') {
        return Err(SettingsError::invalid_value(
            name,
            format!("{what} name must be non-empty and contain no '/'")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use errors::StorageError;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use storage::InMemoryKvStore;

    const PREFIX: &str = "/config/etcd_settings";

    fn manager() -> (Arc<InMemoryKvStore>, ConfigManager) {
        let store = Arc::new(InMemoryKvStore::new());
        (store.clone(), ConfigManager::new(store, PREFIX))
    }

    #[tokio::test]
    async fn test_set_env_defaults_writes_json_blob() {
        let (store, manager) = manager();
        manager
            .set_env_defaults("test", &json!({"A": 1, "D": {"e": "f"}}))
            .await
            .unwrap();

        let raw = store
            .get("/config/etcd_settings/envs/test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&raw).unwrap(),
            json!({"A": 1, "D": {"e": "f"}})
        );
    }

    #[tokio::test]
    async fn test_set_env_defaults_replaces_previous_blob() {
        let (_store, manager) = manager();
        manager
            .set_env_defaults("test", &json!({"A": 1, "B": 2}))
            .await
            .unwrap();
        manager.set_env_defaults("test", &json!({"A": 3})).await.unwrap();

        let defaults = manager.get_env_defaults("test").await.unwrap();
        assert_eq!(Value::Object(defaults), json!({"A": 3}));
    }

    #[tokio::test]
    async fn test_set_env_defaults_accepts_typed_maps() {
        let (_store, manager) = manager();
        let mut defaults = HashMap::new();
        defaults.insert("WORKERS", 4);
        manager.set_env_defaults("prod", &defaults).await.unwrap();

        assert_eq!(
            manager.get_env_defaults("prod").await.unwrap()["WORKERS"],
            json!(4)
        );
    }

    #[tokio::test]
    async fn test_set_env_defaults_rejects_non_mapping() {
        let (store, manager) = manager();
        let err = manager.set_env_defaults("test", &json!([1, 2])).await.unwrap_err();

        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_env_defaults_rejects_unrepresentable_value() {
        let (store, manager) = manager();
        let mut mapping = HashMap::new();
        mapping.insert(vec![1u8], 1);

        let err = manager.set_env_defaults("test", &mapping).await.unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_env_defaults_store_unavailable() {
        let (store, manager) = manager();
        store.set_unavailable(true);

        let err = manager
            .set_env_defaults("test", &json!({"A": 1}))
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_set_config_sets_and_list() {
        let (_store, manager) = manager();
        manager
            .set_config_sets([("foo", json!({"A": 11})), ("bar", json!({"C": {"c3": 2}}))])
            .await
            .unwrap();

        let sets = manager.get_config_sets().await.unwrap();
        assert_eq!(sets.keys().collect::<Vec<_>>(), vec!["bar", "foo"]);
        assert_eq!(Value::Object(sets["foo"].clone()), json!({"A": 11}));
        assert_eq!(
            manager.get_config_set("bar").await.unwrap().unwrap()["C"],
            json!({"c3": 2})
        );
        assert_eq!(manager.get_config_set("baz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_config_sets_reports_partial_failure() {
        let (_store, manager) = manager();
        let err = manager
            .set_config_sets([
                ("good", json!({"A": 1})),
                ("bad", json!("not a mapping")),
                ("also-good", json!({"B": 2})),
            ])
            .await
            .unwrap_err();

        match err {
            SettingsError::PartialWrite { failed } => assert_eq!(failed, vec!["bad".to_string()]),
            other => panic!("unexpected error: {other}")
        }

        let sets = manager.get_config_sets().await.unwrap();
        assert!(sets.contains_key("good"));
        assert!(sets.contains_key("also-good"));
        assert!(!sets.contains_key("bad"));
    }

    #[tokio::test]
    async fn test_set_config_sets_rejects_nested_names() {
        let (_store, manager) = manager();
        let err = manager
            .set_config_sets([("a/b", json!({"A": 1}))])
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::PartialWrite { .. }));
    }

    /// Store that refuses writes to one key.
    struct FlakyStore {
        inner: InMemoryKvStore,
        poisoned: String
    }

    #[async_trait]
    impl KvStore for FlakyStore {
        fn backend(&self) -> &str {
            "Flaky"
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.poisoned {
                return Err(StorageError::QueryError {
                    backend: "Flaky".to_string(),
                    reason: "write refused".to_string()
                });
            }
            self.inner.put(key, value).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_on_one_set_does_not_block_others() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryKvStore::new(),
            poisoned: "/config/etcd_settings/config_sets/bar".to_string()
        });
        let manager = ConfigManager::new(store, PREFIX);

        let err = manager
            .set_config_sets([("foo", json!({"A": 11})), ("bar", json!({"C": {"c3": 2}}))])
            .await
            .unwrap_err();

        assert!(matches!(err, SettingsError::PartialWrite { ref failed } if failed == &["bar"]));
        assert!(manager.get_config_set("foo").await.unwrap().is_some());
    }
}

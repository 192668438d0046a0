use crate::kv::KvStore;
use async_trait::async_trait;
use dashmap::DashMap;
use errors::StorageError;
use std::sync::atomic::{AtomicBool, Ordering};

const BACKEND: &str = "Memory";

/// Process-local store backed by a `DashMap`.
///
/// `set_unavailable(true)` makes every operation fail with a
/// `ConnectionError`, which is how tests exercise the unreachable-store path.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: DashMap<String, String>,
    unavailable: AtomicBool
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionError {
                backend: BACKEND.to_string(),
                reason: "store marked unavailable".to_string()
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_available()?;
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        self.ensure_available()?;
        let mut pairs: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(pairs)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.entries.remove(key);
        Ok(())
    }
}

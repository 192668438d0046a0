use async_trait::async_trait;
use errors::StorageError;

/// Minimal hierarchical key-value API the settings engine relies on.
///
/// A missing key is `Ok(None)`, never an error. Implementations must report
/// an unreachable backend as `ConnectionError`, `QueryError` or `Timeout` so
/// callers can tell "absent" apart from "unavailable".
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name used in logs and error messages.
    fn backend(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

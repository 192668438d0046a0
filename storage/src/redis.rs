use crate::details::StoreDetails;
use crate::kv::KvStore;
use async_trait::async_trait;
use errors::StorageError;
use redis::AsyncCommands;
use redis::{RedisError, RedisResult};
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

const BACKEND: &str = "Redis";
const SCAN_BATCH: usize = 200;

/// Redis-backed [`KvStore`].
///
/// Every operation is bounded by the configured timeout. Connection failures
/// and timeouts are retried with jittered exponential backoff; errors the
/// server reports for the command itself are returned at once. Once retries are exhausted the last error is
/// returned, so callers always get a definitive outcome.
pub struct RedisKvStore {
    connection_manager: ConnectionManager,
    timeout: Duration,
    max_retries: usize
}

impl RedisKvStore {
    pub async fn connect(details: &StoreDetails) -> Result<Self, StorageError> {
        let url = details.connection_url();
        let timeout = Duration::from_millis(details.timeout_ms);

        let client = redis::Client::open(url.as_str()).map_err(|e| {
            StorageError::ConnectionError {
                backend: BACKEND.to_string(),
                reason: e.to_string()
            }
        })?;

        let connection_manager = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| StorageError::Timeout {
                backend: BACKEND.to_string(),
                timeout_ms: details.timeout_ms
            })?
            .map_err(|e| StorageError::ConnectionError {
                backend: BACKEND.to_string(),
                reason: e.to_string()
            })?;

        debug!(%url, "Connected to settings store");

        Ok(Self {
            connection_manager,
            timeout,
            max_retries: details.max_retries
        })
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        ExponentialBackoff::from_millis(2)
            .factor(25)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(self.max_retries)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>
    {
        let timeout = self.timeout;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        RetryIf::spawn(
            self.retry_strategy(),
            || {
                let fut = op(self.connection_manager.clone());
                async move {
                    match tokio::time::timeout(timeout, fut).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) if is_transient(&e) => {
                            warn!(operation, error = %e, "Redis operation failed, will retry");
                            Err(StorageError::ConnectionError {
                                backend: BACKEND.to_string(),
                                reason: e.to_string()
                            })
                        }
                        Ok(Err(e)) => {
                            warn!(operation, error = %e, "Redis operation rejected");
                            Err(StorageError::QueryError {
                                backend: BACKEND.to_string(),
                                reason: e.to_string()
                            })
                        }
                        Err(_) => {
                            warn!(operation, timeout_ms, "Redis operation timed out");
                            Err(StorageError::Timeout {
                                backend: BACKEND.to_string(),
                                timeout_ms
                            })
                        }
                    }
                }
            },
            is_retryable
        )
        .await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = self
                .with_retry("scan", |mut conn| async move {
                    let page: RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await;
                    page
                })
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_retry("get", |mut conn| async move {
            let value: RedisResult<Option<String>> = conn.get(key).await;
            value
        })
        .await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_retry("put", |mut conn| async move {
            let written: RedisResult<()> = conn.set(key, value).await;
            written
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let pattern = format!("{}*", escape_glob(prefix));
        let keys = self.scan_keys(&pattern).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = self
            .with_retry("mget", |mut conn| {
                let keys = &keys;
                async move {
                    let values: RedisResult<Vec<Option<String>>> =
                        redis::cmd("MGET").arg(keys).query_async(&mut conn).await;
                    values
                }
            })
            .await?;

        // Keys deleted between SCAN and MGET come back as nil and are skipped.
        Ok(keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.with_retry("delete", |mut conn| async move {
            let removed: RedisResult<i64> = conn.del(key).await;
            removed.map(|_| ())
        })
        .await
    }
}

/// Escapes Redis glob metacharacters so a prefix matches literally.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Errors worth another attempt: the connection, not the command, failed.
fn is_transient(error: &RedisError) -> bool {
    error.is_io_error() || error.is_timeout() || error.is_connection_dropped()
}

fn is_retryable(error: &StorageError) -> bool {
    matches!(
        error,
        StorageError::ConnectionError { .. } | StorageError::Timeout { .. }
    )
}

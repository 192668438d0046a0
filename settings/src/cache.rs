//! Cache of the environment-defaults layer.
//!
//! Only the environment layer is ever cached. The dynamic overlay depends on
//! the request and is re-selected on every resolution.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use errors::SettingsError;
use parking_lot::RwLock;
use tracing::debug;

use crate::Mapping;

/// How long a fetched environment layer stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Fetch from the store on every resolution.
    Disabled,
    /// Refetch once the entry is older than the given duration.
    Ttl(Duration),
    /// Keep the entry until [`EnvDefaultsCache::invalidate`] is called.
    UntilInvalidated
}

impl CachePolicy {
    /// `None` keeps entries until invalidated, `Some(0)` disables caching.
    pub fn from_ttl_seconds(ttl: Option<u64>) -> Self {
        match ttl {
            None => CachePolicy::UntilInvalidated,
            Some(0) => CachePolicy::Disabled,
            Some(seconds) => CachePolicy::Ttl(Duration::from_secs(seconds))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Populated
}

#[derive(Debug)]
struct CachedLayer {
    values: Arc<Mapping>,
    fetched_at: Instant
}

/// Shared holder of the environment-defaults layer.
///
/// Refreshes replace the whole layer under a write lock, so readers see
/// either the previous mapping or the new one, never a mix.
///
/// Every [`invalidate`](Self::invalidate) bumps a generation counter. A fetch
/// that started under an older generation is returned to its caller but never
/// written back.
#[derive(Debug)]
pub struct EnvDefaultsCache {
    policy: CachePolicy,
    slot: RwLock<Option<CachedLayer>>,
    generation: AtomicU64
}

impl EnvDefaultsCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            slot: RwLock::new(None),
            generation: AtomicU64::new(0)
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn state(&self) -> CacheState {
        if self.slot.read().is_some() {
            CacheState::Populated
        } else {
            CacheState::Empty
        }
    }

    /// The cached layer, if present and still fresh under the policy.
    pub fn get_fresh(&self) -> Option<Arc<Mapping>> {
        let slot = self.slot.read();
        let cached = slot.as_ref()?;
        let fresh = match self.policy {
            CachePolicy::Disabled => false,
            CachePolicy::UntilInvalidated => true,
            CachePolicy::Ttl(ttl) => cached.fetched_at.elapsed() < ttl
        };
        fresh.then(|| Arc::clone(&cached.values))
    }

    pub fn store(&self, values: Mapping) -> Arc<Mapping> {
        let generation = self.generation.load(Ordering::Acquire);
        self.store_if_current(values, generation)
    }

    /// Drop the cached layer; the next lookup refetches.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
        debug!("Environment defaults cache invalidated");
    }

    /// Cache `values` unless the cache was invalidated after `generation`
    /// was read.
    fn store_if_current(&self, values: Mapping, generation: u64) -> Arc<Mapping> {
        let values = Arc::new(values);
        if self.policy == CachePolicy::Disabled {
            return values;
        }

        let mut slot = self.slot.write();
        if self.generation.load(Ordering::Acquire) == generation {
            *slot = Some(CachedLayer {
                values: Arc::clone(&values),
                fetched_at: Instant::now()
            });
        } else {
            metrics::counter!("settings_env_cache_stale_discards_total").increment(1);
            debug!("Discarding environment defaults fetched before invalidation");
        }
        values
    }

    /// Return the fresh cached layer, or fetch, store and return a new one.
    ///
    /// A failed fetch leaves the cache untouched.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<Arc<Mapping>, SettingsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Mapping, SettingsError>>
    {
        if let Some(values) = self.get_fresh() {
            metrics::counter!("settings_env_cache_hits_total").increment(1);
            return Ok(values);
        }

        metrics::counter!("settings_env_cache_misses_total").increment(1);
        let generation = self.generation.load(Ordering::Acquire);
        let values = fetch().await?;
        if self.policy != CachePolicy::Disabled {
            metrics::counter!("settings_env_cache_refreshes_total").increment(1);
            debug!(keys = values.len(), "Environment defaults cache refreshed");
        }
        Ok(self.store_if_current(values, generation))
    }
}

//! # Overwrite Loader
//!
//! Reads environment defaults and named config sets from the store and
//! deep-merges them.
//!
//! Missing blobs are empty mappings, not errors: an environment without
//! defaults is valid, and a stale or mistyped selector must not fail the
//! request. Only an unreachable store is an error.

use std::sync::Arc;

use context::RequestContext;
use errors::SettingsError;
use storage::{KeyLayout, KvStore, RedisKvStore, StoreDetails};
use tracing::{debug, instrument, warn};

use crate::Mapping;
use crate::codec::decode_mapping;
use crate::merge::merge_with_logging;

/// Read side of the settings store.
///
/// Cheap to clone; clones share the underlying store client.
#[derive(Clone)]
pub struct OverwriteLoader {
    store: Arc<dyn KvStore>,
    layout: KeyLayout
}

impl std::fmt::Debug for OverwriteLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverwriteLoader")
            .field("backend", &self.store.backend())
            .field("layout", &self.layout)
            .finish()
    }
}

impl OverwriteLoader {
    pub fn new(store: Arc<dyn KvStore>, prefix: &str) -> Self {
        Self {
            store,
            layout: KeyLayout::new(prefix)
        }
    }

    /// Connect to the Redis store described by `details`.
    pub async fn connect(details: &StoreDetails) -> Result<Self, SettingsError> {
        let store = RedisKvStore::connect(details).await?;
        Ok(Self::new(Arc::new(store), &details.prefix))
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub(crate) fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Defaults blob for `env`, or an empty mapping when none was written.
    #[instrument(skip(self), fields(backend = %self.store.backend()))]
    pub async fn load_env_defaults(&self, env: &str) -> Result<Mapping, SettingsError> {
        let key = self.layout.env_key(env);
        match self.store.get(&key).await? {
            Some(raw) => decode_mapping(&key, &raw),
            None => {
                debug!(env, "No environment defaults stored");
                Ok(Mapping::new())
            }
        }
    }

    /// Config set `name`, or `None` when it was never written.
    pub async fn find_config_set(&self, name: &str) -> Result<Option<Mapping>, SettingsError> {
        let key = self.layout.config_set_key(name);
        match self.store.get(&key).await? {
            Some(raw) => decode_mapping(&key, &raw).map(Some),
            None => Ok(None)
        }
    }

    /// Config set `name`, or an empty mapping when it was never written.
    #[instrument(skip(self), fields(backend = %self.store.backend()))]
    pub async fn load_config_set(&self, name: &str) -> Result<Mapping, SettingsError> {
        match self.find_config_set(name).await? {
            Some(mapping) => Ok(mapping),
            None => {
                warn!(config_set = name, "Selected config set does not exist, ignoring");
                metrics::counter!("settings_unknown_config_set_total").increment(1);
                Ok(Mapping::new())
            }
        }
    }

    /// Overlay selected by `ctx`, if the request carries a selector.
    pub async fn load_overlay(
        &self,
        ctx: Option<&RequestContext>
    ) -> Result<Option<Mapping>, SettingsError> {
        match ctx.and_then(RequestContext::selector) {
            Some(selector) => self.load_config_set(selector).await.map(Some),
            None => Ok(None)
        }
    }

    /// Environment defaults with the request's config set merged on top.
    pub async fn get_overwrites(
        &self,
        env: &str,
        ctx: Option<&RequestContext>
    ) -> Result<Mapping, SettingsError> {
        let defaults = self.load_env_defaults(env).await?;
        match self.load_overlay(ctx).await? {
            Some(overlay) => Ok(merge_with_logging(defaults, &overlay, "config_set")),
            None => Ok(defaults)
        }
    }
}

/// One-shot load against the store described by `details`.
pub async fn get_overwrites(
    env: &str,
    ctx: Option<&RequestContext>,
    details: &StoreDetails
) -> Result<Mapping, SettingsError> {
    OverwriteLoader::connect(details)
        .await?
        .get_overwrites(env, ctx)
        .await
}

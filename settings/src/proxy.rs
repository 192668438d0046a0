//! # Settings Proxy
//!
//! Process-facing facade combining three layers, highest priority first:
//!
//! 1. the config set selected by the current request, deep-merged over
//! 2. the environment defaults from the store, which replace
//! 3. the host's static settings
//!
//! The environment layer may be cached (see [`EnvDefaultsCache`]); the
//! overlay is re-selected from the request context on every call.

use std::sync::Arc;

use context::{RequestContext, RequestContextResolver};
use errors::SettingsError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::Mapping;
use crate::cache::{CachePolicy, CacheState, EnvDefaultsCache};
use crate::config::ProxyConfig;
use crate::host::HostSettings;
use crate::loader::OverwriteLoader;
use crate::merge::deep_merge;

/// Resolution engine serving layered settings on demand.
pub struct SettingsProxy {
    env: String,
    selector_header: String,
    host: Arc<dyn HostSettings>,
    loader: OverwriteLoader,
    resolver: Arc<dyn RequestContextResolver>,
    cache: EnvDefaultsCache
}

impl std::fmt::Debug for SettingsProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsProxy")
            .field("env", &self.env)
            .field("loader", &self.loader)
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SettingsProxy {
    pub fn builder(
        env: impl Into<String>,
        host: Arc<dyn HostSettings>,
        loader: OverwriteLoader
    ) -> SettingsProxyBuilder {
        SettingsProxyBuilder {
            env: env.into(),
            selector_header: context::DEFAULT_SELECTOR_HEADER.to_string(),
            host,
            loader,
            resolver: None,
            cache_policy: CachePolicy::Ttl(std::time::Duration::from_secs(30))
        }
    }

    /// Build a proxy from `config`, connecting to the configured store.
    pub async fn from_config(
        config: &ProxyConfig,
        host: Arc<dyn HostSettings>
    ) -> Result<Self, SettingsError> {
        config.check()?;
        let loader = OverwriteLoader::connect(&config.store).await?;
        Ok(Self::builder(config.env.clone(), host, loader)
            .resolver(config.request_resolver.build())
            .cache_policy(CachePolicy::from_ttl_seconds(config.cache_ttl_seconds))
            .selector_header(config.selector_header.clone())
            .build())
    }

    /// Build a proxy whose own configuration is read from the host settings.
    pub async fn from_host(host: Arc<dyn HostSettings>) -> Result<Self, SettingsError> {
        let config = ProxyConfig::from_host(host.as_ref())?;
        Self::from_config(&config, host).await
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Force the next resolution to refetch environment defaults.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Build a request context from headers using the configured selector
    /// header name.
    pub fn context_from_headers<I, K, V>(&self, headers: I) -> RequestContext
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>
    {
        RequestContext::from_headers_named(&self.selector_header, headers)
    }

    /// Value of `name` for the current request.
    pub async fn get(&self, name: &str) -> Result<Value, SettingsError> {
        let ctx = self.resolver.current();
        let result = match self.view_for(ctx.as_ref()).await {
            Ok(view) => view.get(name),
            Err(e) => Err(e)
        };
        if let Err(e) = &result {
            record_lookup_failure(e);
        }
        result
    }

    /// Value of `name` deserialized into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, SettingsError> {
        let value = self.get(name).await?;
        serde_json::from_value(value).map_err(|e| SettingsError::invalid_value(name, e))
    }

    pub async fn contains(&self, name: &str) -> Result<bool, SettingsError> {
        match self.get(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e)
        }
    }

    /// Every visible setting for the current request.
    pub async fn as_mapping(&self) -> Result<Mapping, SettingsError> {
        let ctx = self.resolver.current();
        Ok(self.view_for(ctx.as_ref()).await?.to_mapping())
    }

    /// Snapshot of the layers for the current request.
    ///
    /// Useful when one request reads several settings: the store is consulted
    /// once and every lookup sees the same layers.
    pub async fn view(&self) -> Result<SettingsView, SettingsError> {
        let ctx = self.resolver.current();
        self.view_for(ctx.as_ref()).await
    }

    /// Snapshot of the layers for an explicitly passed request context,
    /// bypassing the installed resolver.
    #[instrument(
        skip(self, ctx),
        fields(env = %self.env, selector = tracing::field::Empty)
    )]
    pub async fn view_for(
        &self,
        ctx: Option<&RequestContext>
    ) -> Result<SettingsView, SettingsError> {
        let selector = ctx.and_then(RequestContext::selector);
        tracing::Span::current().record("selector", selector);

        let loader = &self.loader;
        let env = self.env.as_str();
        let env_defaults = self
            .cache
            .get_or_refresh(|| loader.load_env_defaults(env))
            .await?;

        let overlay = loader.load_overlay(ctx).await?;
        if let Some(name) = selector {
            debug!(config_set = name, "Dynamic overlay selected");
        }

        Ok(SettingsView {
            host: Arc::clone(&self.host),
            env_defaults,
            overlay,
            selector: selector.map(str::to_string)
        })
    }
}

fn record_lookup_failure(error: &SettingsError) {
    metrics::counter!("settings_lookup_failures_total", "code" => error.code().to_string())
        .increment(1);
    if !error.is_not_found() {
        tracing::warn!(code = %error.code(), error = %error, "Settings lookup failed");
    }
}

pub struct SettingsProxyBuilder {
    env: String,
    selector_header: String,
    host: Arc<dyn HostSettings>,
    loader: OverwriteLoader,
    resolver: Option<Arc<dyn RequestContextResolver>>,
    cache_policy: CachePolicy
}

impl SettingsProxyBuilder {
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn RequestContextResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    #[must_use]
    pub fn selector_header(mut self, header: impl Into<String>) -> Self {
        self.selector_header = header.into();
        self
    }

    pub fn build(self) -> SettingsProxy {
        SettingsProxy {
            env: self.env,
            selector_header: self.selector_header,
            host: self.host,
            loader: self.loader,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(context::NoRequestResolver)),
            cache: EnvDefaultsCache::new(self.cache_policy)
        }
    }
}

/// Merged settings view for one request.
///
/// Owned by the call that produced it; never shared across requests.
pub struct SettingsView {
    host: Arc<dyn HostSettings>,
    env_defaults: Arc<Mapping>,
    overlay: Option<Mapping>,
    selector: Option<String>
}

impl std::fmt::Debug for SettingsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsView")
            .field("env_defaults", &self.env_defaults)
            .field("overlay", &self.overlay)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl SettingsView {
    /// Config set applied to this view, if the request selected one.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn get(&self, name: &str) -> Result<Value, SettingsError> {
        let env_value = self.env_defaults.get(name);
        let overlay_value = self.overlay.as_ref().and_then(|o| o.get(name));

        match (env_value, overlay_value) {
            (Some(base), Some(overlay)) => {
                let mut merged = base.clone();
                deep_merge(&mut merged, overlay);
                Ok(merged)
            }
            (None, Some(overlay)) => Ok(overlay.clone()),
            (Some(base), None) => Ok(base.clone()),
            (None, None) => self
                .host
                .get(name)
                .ok_or_else(|| SettingsError::not_found(name))
        }
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, SettingsError> {
        serde_json::from_value(self.get(name)?).map_err(|e| SettingsError::invalid_value(name, e))
    }

    /// Union of keys across all layers, each bound to its resolved value.
    pub fn to_mapping(&self) -> Mapping {
        let mut merged: Mapping = self
            .host
            .keys()
            .into_iter()
            .filter_map(|key| self.host.get(&key).map(|value| (key, value)))
            .collect();

        for (key, value) in self.env_defaults.iter() {
            merged.insert(key.clone(), value.clone());
        }

        if let Some(overlay) = &self.overlay {
            for (key, value) in overlay {
                match self.env_defaults.get(key) {
                    Some(base) => {
                        let mut combined = base.clone();
                        deep_merge(&mut combined, value);
                        merged.insert(key.clone(), combined);
                    }
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        merged
    }
}

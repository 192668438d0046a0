//! Process-wide accessor over one long-lived [`SettingsProxy`].
//!
//! Purely a convenience: everything here delegates to the installed
//! instance, which can equally be passed around explicitly.

use std::sync::OnceLock;

use errors::SettingsError;

use crate::proxy::SettingsProxy;

static PROXY: OnceLock<SettingsProxy> = OnceLock::new();

/// Install the process-wide proxy. Fails if one is already installed.
pub fn install(proxy: SettingsProxy) -> Result<&'static SettingsProxy, SettingsError> {
    let env = proxy.env().to_string();
    PROXY
        .set(proxy)
        .map_err(|_| SettingsError::invalid_config("a settings proxy is already installed"))?;
    tracing::info!(%env, "Process-wide settings proxy installed");
    proxy_ref()
}

/// The installed proxy.
pub fn proxy() -> Result<&'static SettingsProxy, SettingsError> {
    proxy_ref()
}

pub fn is_installed() -> bool {
    PROXY.get().is_some()
}

fn proxy_ref() -> Result<&'static SettingsProxy, SettingsError> {
    PROXY
        .get()
        .ok_or_else(|| SettingsError::invalid_config("no settings proxy installed"))
}

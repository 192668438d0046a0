//! The process-wide accessor. Kept in its own test binary since the
//! installed proxy lives for the whole process.

use std::sync::Arc;

use serde_json::json;
use settings::{ConfigManager, OverwriteLoader, SettingsProxy, StaticSettings, global};
use storage::InMemoryKvStore;

#[tokio::test]
async fn test_install_once_and_read_through_accessor() {
    assert!(!global::is_installed());
    assert!(global::proxy().is_err());

    let store = Arc::new(InMemoryKvStore::new());
    ConfigManager::new(store.clone(), "/config/global")
        .set_env_defaults("prod", &json!({"FEATURE": true}))
        .await
        .unwrap();

    let host = Arc::new(StaticSettings::new().with("SETTINGS_ENV", "prod"));
    let proxy =
        SettingsProxy::builder("prod", host.clone(), OverwriteLoader::new(store.clone(), "/config/global"))
            .build();
    global::install(proxy).unwrap();

    assert!(global::is_installed());
    let installed = global::proxy().unwrap();
    assert_eq!(installed.env(), "prod");
    assert_eq!(installed.get("FEATURE").await.unwrap(), json!(true));

    let second = SettingsProxy::builder("other", host, OverwriteLoader::new(store, "/config/global"))
        .build();
    let err = global::install(second).unwrap_err();
    assert!(matches!(err, settings::SettingsError::InvalidConfig { .. }));
    assert_eq!(global::proxy().unwrap().env(), "prod");
}

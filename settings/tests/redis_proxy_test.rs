//! End-to-end resolution against a real Redis store.
//!
//! Uses the shared testcontainers Redis fixture; skipped when Docker is not
//! available.

use std::sync::Arc;

use context::{RequestContext, TaskLocalResolver};
use serde_json::json;
use settings::{ConfigManager, SettingsProxy, StaticSettings, StoreDetails, get_overwrites};
use testing::{redis, unique_prefix};

async fn details() -> Option<StoreDetails> {
    let fixture = redis().await?;
    Some(StoreDetails::new(fixture.host(), fixture.port(), &unique_prefix()))
}

async fn seed(details: &StoreDetails) -> ConfigManager {
    let manager = ConfigManager::connect(details)
        .await
        .expect("Failed to connect to Redis fixture");
    manager
        .set_env_defaults(
            "test",
            &json!({"A": 1, "B": "c", "D": {"e": "f"}, "E": 1, "C": {"c2": 1}})
        )
        .await
        .unwrap();
    manager
        .set_config_sets([("foo", json!({"A": 11})), ("bar", json!({"C": {"c3": 2}}))])
        .await
        .unwrap();
    manager
}

#[tokio::test]
async fn test_written_settings_visible_to_fresh_loader() {
    let Some(details) = details().await else {
        eprintln!("Skipping Redis test: Docker not available");
        return;
    };
    let manager = seed(&details).await;

    let plain = get_overwrites("test", None, &details).await.unwrap();
    assert_eq!(plain["A"], json!(1));

    let foo = RequestContext::with_selector("foo");
    let merged = get_overwrites("test", Some(&foo), &details).await.unwrap();
    assert_eq!(merged["A"], json!(11));
    assert_eq!(merged["B"], json!("c"));

    let sets = manager.get_config_sets().await.unwrap();
    assert_eq!(sets.keys().collect::<Vec<_>>(), vec!["bar", "foo"]);
}

#[tokio::test]
async fn test_proxy_configured_from_host_settings() {
    let Some(details) = details().await else {
        eprintln!("Skipping Redis test: Docker not available");
        return;
    };
    seed(&details).await;

    let host = Arc::new(
        StaticSettings::new()
            .with("SETTINGS_ENV", "test")
            .with("SETTINGS_STORE", serde_json::to_value(&details).unwrap())
            .with("SETTINGS_REQUEST_RESOLVER", "task_local")
            .with("E", 0)
    );
    let proxy = SettingsProxy::from_host(host).await.unwrap();

    assert_eq!(proxy.get("E").await.unwrap(), json!(1));
    assert_eq!(proxy.get("SETTINGS_ENV").await.unwrap(), json!("test"));

    let c = TaskLocalResolver::scope(RequestContext::with_selector("bar"), proxy.get("C"))
        .await
        .unwrap();
    assert_eq!(c, json!({"c2": 1, "c3": 2}));
    assert!(proxy.get("MISSING").await.unwrap_err().is_not_found());
}

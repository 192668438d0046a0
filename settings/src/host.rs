//! # Host Settings
//!
//! The host process's static settings, the lowest-priority layer.
//!
//! [`StaticSettings`] can be built in code, from a TOML or YAML file (format
//! detected by extension), or from prefixed environment variables.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use errors::SettingsError;
use serde_json::Value;

use crate::Mapping;

/// Read-only key/value lookup over the host's static configuration.
pub trait HostSettings: Send + Sync {
    fn get(&self, name: &str) -> Option<Value>;

    fn keys(&self) -> Vec<String>;
}

/// Host settings file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Settings file must contain a mapping at the top level")]
    NotAMapping,

    #[error("Settings file has no extension")]
    NoExtension,

    #[error("Unsupported settings file format: {0}")]
    UnsupportedFormat(String)
}

impl From<ConfigFileError> for SettingsError {
    fn from(err: ConfigFileError) -> Self {
        SettingsError::invalid_config(err)
    }
}

/// In-memory host settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticSettings {
    values: Mapping
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(values: Mapping) -> Self {
        Self { values }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.values
    }

    /// Load host settings from a file, choosing the parser by extension
    /// (`.toml`, `.yaml`, `.yml`).
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or(ConfigFileError::NoExtension)?;

        match extension.to_ascii_lowercase().as_str() {
            "toml" => Self::load_from_toml(path),
            "yaml" | "yml" => Self::load_from_yaml(path),
            other => Err(ConfigFileError::UnsupportedFormat(other.to_string()))
        }
    }

    pub fn load_from_toml(path: &Path) -> Result<Self, ConfigFileError> {
        let contents = read(path)?;
        let value: Value =
            toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn load_from_yaml(path: &Path) -> Result<Self, ConfigFileError> {
        let contents = read(path)?;
        let value: Value = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigFileError::YamlParse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Collect every environment variable starting with `prefix`.
    ///
    /// The prefix is stripped from the setting name. Values that parse as
    /// JSON (`true`, `42`, `{"a":1}`) keep their type; anything else is
    /// stored as a string.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, env::vars())
    }

    fn from_vars(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let values = vars
            .into_iter()
            .filter_map(|(key, raw)| {
                let name = key.strip_prefix(prefix)?;
                if name.is_empty() {
                    return None;
                }
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                Some((name.to_string(), value))
            })
            .collect();

        Self { values }
    }

    fn from_value(value: Value) -> Result<Self, ConfigFileError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            _ => Err(ConfigFileError::NotAMapping)
        }
    }
}

impl FromIterator<(String, Value)> for StaticSettings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect()
        }
    }
}

impl From<BTreeMap<String, Value>> for StaticSettings {
    fn from(values: BTreeMap<String, Value>) -> Self {
        values.into_iter().collect()
    }
}

impl HostSettings for StaticSettings {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

fn read(path: &Path) -> Result<String, ConfigFileError> {
    std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str) -> NamedTempFile {
        tempfile::Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_static_settings_lookup() {
        let host = StaticSettings::new().with("E", 0).with("DEBUG", true);
        assert_eq!(host.get("E"), Some(json!(0)));
        assert_eq!(host.get("MISSING"), None);
        assert_eq!(host.keys(), vec!["DEBUG".to_string(), "E".to_string()]);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = temp_file(".toml");
        writeln!(
            file,
            r#"
SETTINGS_ENV = "test"
E = 0

[SETTINGS_STORE]
host = "etcd"
port = 2379
prefix = "/config/etcd_settings"
"#
        )
        .unwrap();

        let host = StaticSettings::load_from_file(file.path()).unwrap();
        assert_eq!(host.get("SETTINGS_ENV"), Some(json!("test")));
        assert_eq!(host.get("SETTINGS_STORE").unwrap()["port"], json!(2379));
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = temp_file(".yaml");
        writeln!(file, "SETTINGS_ENV: test\nFEATURES:\n  - a\n  - b\n").unwrap();

        let host = StaticSettings::load_from_file(file.path()).unwrap();
        assert_eq!(host.get("FEATURES"), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_load_yaml_scalar_is_rejected() {
        let mut file = temp_file(".yml");
        writeln!(file, "just a string").unwrap();

        assert!(matches!(
            StaticSettings::load_from_file(file.path()),
            Err(ConfigFileError::NotAMapping)
        ));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let file = temp_file(".ini");
        assert!(matches!(
            StaticSettings::load_from_file(file.path()),
            Err(ConfigFileError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = StaticSettings::load_from_toml(Path::new("/nonexistent/settings.toml"));
        assert!(matches!(result, Err(ConfigFileError::FileNotFound(_))));
    }

    #[test]
    fn test_from_vars_strips_prefix_and_types_values() {
        let vars = vec![
            ("APP_DEBUG".to_string(), "true".to_string()),
            ("APP_WORKERS".to_string(), "4".to_string()),
            ("APP_NAME".to_string(), "billing".to_string()),
            ("APP_".to_string(), "ignored".to_string()),
            ("OTHER".to_string(), "x".to_string()),
        ];

        let host = StaticSettings::from_vars("APP_", vars);
        assert_eq!(host.get("DEBUG"), Some(json!(true)));
        assert_eq!(host.get("WORKERS"), Some(json!(4)));
        assert_eq!(host.get("NAME"), Some(json!("billing")));
        assert_eq!(host.keys().len(), 3);
    }
}

/// Key layout for settings blobs under a prefix.
///
/// - `{prefix}/envs/{env}` holds one environment's defaults
/// - `{prefix}/config_sets/{name}` holds one named overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String
}

const ENVS_SEGMENT: &str = "envs";
const CONFIG_SETS_SEGMENT: &str = "config_sets";

impl KeyLayout {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn env_key(&self, env: &str) -> String {
        format!("{}/{}/{}", self.prefix, ENVS_SEGMENT, env)
    }

    pub fn config_set_key(&self, name: &str) -> String {
        format!("{}{}", self.config_sets_prefix(), name)
    }

    /// Prefix shared by every config set key, trailing slash included.
    pub fn config_sets_prefix(&self) -> String {
        format!("{}/{}/", self.prefix, CONFIG_SETS_SEGMENT)
    }

    /// Config set name for a key listed under [`Self::config_sets_prefix`].
    pub fn config_set_name<'a>(&self, key: &'a str) -> Option<&'a str> {
        let prefix = self.config_sets_prefix();
        key.strip_prefix(prefix.as_str())
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }
}

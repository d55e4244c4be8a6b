//! Runtime configuration.
//!
//! A [`RoConfig`] is stored as TOML. Remote endpoint settings and credentials
//! can also come from the environment, which takes precedence over the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RoResult};
use crate::id::MintStrategy;
use crate::namespace::{Namespaces, DEFAULT_BASE};
use crate::store::{OxigraphStore, RemoteConfig, RemoteSparqlStore, TripleStore};

/// Environment variable overriding the remote query endpoint.
pub const ENV_QUERY_ENDPOINT: &str = "RO_GRAPH_QUERY_ENDPOINT";
/// Environment variable overriding the remote update endpoint.
pub const ENV_UPDATE_ENDPOINT: &str = "RO_GRAPH_UPDATE_ENDPOINT";
pub const ENV_USERNAME: &str = "RO_GRAPH_USERNAME";
pub const ENV_PASSWORD: &str = "RO_GRAPH_PASSWORD";

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Which triple store backs the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreConfig {
    /// Embedded, in memory. Lost on exit.
    #[default]
    Memory,
    /// Embedded, persisted under `path`.
    Disk { path: PathBuf },
    /// A SPARQL 1.1 protocol endpoint pair.
    Remote(RemoteConfig),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoConfig {
    /// Base IRI the obligation and concept namespaces derive from.
    pub namespace_base: String,
    /// Language tag of entity and concept labels.
    pub language: String,
    pub minting: MintStrategy,
    pub store: StoreConfig,
}

impl Default for RoConfig {
    fn default() -> Self {
        Self {
            namespace_base: DEFAULT_BASE.to_string(),
            language: "en".to_string(),
            minting: MintStrategy::default(),
            store: StoreConfig::default(),
        }
    }
}

impl RoConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Apply `RO_GRAPH_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// Both endpoint variables switch the store to remote. Credentials only
    /// apply to a store that is remote after that step.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let query = lookup(ENV_QUERY_ENDPOINT);
        let update = lookup(ENV_UPDATE_ENDPOINT);
        if let StoreConfig::Remote(remote) = &mut self.store {
            if let Some(q) = query {
                remote.query_endpoint = q;
            }
            if let Some(u) = update {
                remote.update_endpoint = u;
            }
        } else if let (Some(q), Some(u)) = (query, update) {
            tracing::debug!(query_endpoint = %q, "remote store selected by environment");
            self.store = StoreConfig::Remote(RemoteConfig::new(q, u));
        }
        if let StoreConfig::Remote(remote) = &mut self.store {
            if let Some(user) = lookup(ENV_USERNAME) {
                remote.username = Some(user);
            }
            if let Some(password) = lookup(ENV_PASSWORD) {
                remote.password = Some(password);
            }
        }
        self
    }

    /// Namespaces derived from `namespace_base`.
    pub fn namespaces(&self) -> ConfigResult<Namespaces> {
        Namespaces::from_base(&self.namespace_base)
    }

    /// Open the configured store.
    pub fn open_store(&self) -> RoResult<Box<dyn TripleStore>> {
        let store: Box<dyn TripleStore> = match &self.store {
            StoreConfig::Memory => Box::new(OxigraphStore::in_memory()?),
            StoreConfig::Disk { path } => Box::new(OxigraphStore::open(path)?),
            StoreConfig::Remote(remote) => Box::new(RemoteSparqlStore::new(remote.clone())),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = RoConfig::default();
        assert_eq!(config.namespace_base, "http://dgfisma.com/");
        assert_eq!(config.minting, MintStrategy::RandomSerial);
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(
            config.namespaces().unwrap().obligations(),
            "http://dgfisma.com/reporting_obligations/"
        );
    }

    #[test]
    fn parses_partial_toml() {
        let toml = r#"
            minting = "sequential"

            [store]
            kind = "disk"
            path = "/var/lib/ro"
        "#;
        let config = RoConfig::from_toml(toml, Path::new("inline")).unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.minting, MintStrategy::Sequential);
        assert_eq!(
            config.store,
            StoreConfig::Disk {
                path: PathBuf::from("/var/lib/ro")
            }
        );
    }

    #[test]
    fn parse_error_names_the_file() {
        let err = RoConfig::from_toml("minting = 3", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "bad.toml"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = RoConfig {
            store: StoreConfig::Remote(
                RemoteConfig::new("http://h/query", "http://h/update").with_credentials("u", "p"),
            ),
            ..RoConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RoConfig::load(Path::new("/nonexistent/ro-graph.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn environment_selects_remote_store() {
        let config = RoConfig::default().with_overrides(env(&[
            (ENV_QUERY_ENDPOINT, "http://h/query"),
            (ENV_UPDATE_ENDPOINT, "http://h/update"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "secret"),
        ]));
        let StoreConfig::Remote(remote) = config.store else {
            panic!("expected remote store");
        };
        assert_eq!(remote.query_endpoint, "http://h/query");
        assert_eq!(remote.username.as_deref(), Some("admin"));
        assert_eq!(remote.password.as_deref(), Some("secret"));
    }

    #[test]
    fn credentials_alone_leave_local_store() {
        let config = RoConfig::default().with_overrides(env(&[(ENV_USERNAME, "admin")]));
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn bad_base_is_rejected() {
        let config = RoConfig {
            namespace_base: "no-slash".into(),
            ..RoConfig::default()
        };
        assert!(matches!(config.namespaces(), Err(ConfigError::Namespace { .. })));
    }
}

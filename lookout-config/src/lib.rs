//! Loader for workspace configuration with YAML + environment overlays,
//! plus the data-file stores the server reloads at runtime.
//!
//! `lookout.yaml` holds the static server configuration (bind address, data
//! directory, auth accounts, limits). The four *data files* under the data
//! directory (API keys, search engines, websites catalog, proxied domains)
//! are loaded separately ([`files`]) and reloaded wholesale by the polling
//! watcher ([`watch`]) whenever they change on disk.
use config::{Config, ConfigError as RawConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod catalog;
pub mod credentials;
pub mod domains;
pub mod files;
pub mod watch;

pub use catalog::WebsiteCatalog;
pub use credentials::{ChangeSet, NamedValues};
pub use domains::ProxiedDomains;
pub use files::{DataFiles, DataPaths, SharedData};
pub use watch::{DataChange, spawn_watcher};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Errors produced while loading or editing configuration and data files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration load failed: {0}")]
    Load(String),
    #[error("{file}:{line}: malformed entry: {reason}")]
    Malformed {
        file: String,
        line: usize,
        reason: String,
    },
    #[error("duplicate name '{0}'")]
    DuplicateName(String),
    #[error("unknown name '{0}'")]
    UnknownName(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<RawConfigError> for ConfigError {
    fn from(e: RawConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}

/// Result alias for fallible configuration operations.
pub type ConfigResult<T = ()> = Result<T, ConfigError>;

/// Top-level static configuration, deserialized from `lookout.yaml` merged
/// with `LOOKOUT_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct LookoutConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub server: ServerSettings,
    /// Directory holding the editable data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding cached preview pages.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Seconds between data-file mtime polls.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
    #[serde(default)]
    pub search: SearchSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Sliding idle TTL for sessions, in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default)]
    pub rate: RateSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_ttl_secs: default_session_ttl(),
            rate: RateSettings::default(),
        }
    }
}

/// Token-bucket parameters, per session.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateSettings {
    #[serde(default = "default_search_per_minute")]
    pub search_per_minute: u32,
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            search_per_minute: default_search_per_minute(),
            login_per_minute: default_login_per_minute(),
            burst: default_burst(),
        }
    }
}

/// Knobs for the search fan-out. The per-page size and the start-index cap
/// are fixed by the Custom Search API itself and are not configurable.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SearchSettings {
    /// Upper bound on API requests spent on one query.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
        }
    }
}

/// Login accounts. Passwords usually arrive through `${VAR}` expansion so
/// the YAML file itself carries no secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub admin: Account,
    pub employee: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub user: String,
    pub password: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_session_ttl() -> u64 {
    3600
}
fn default_search_per_minute() -> u32 {
    30
}
fn default_login_per_minute() -> u32 {
    10
}
fn default_burst() -> u32 {
    10
}
fn default_max_pages() -> u32 {
    10
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}
fn default_watch_interval() -> u64 {
    2
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct LookoutConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for LookoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LookoutConfigLoader {
    /// Start with sensible defaults: YAML file + `LOOKOUT_` env overrides.
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("LOOKOUT").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use lookout_config::LookoutConfigLoader;
    ///
    /// let cfg = LookoutConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// auth:
    ///   admin: { user: "root", password: "pw" }
    ///   employee: { user: "emp", password: "pw" }
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.auth.admin.user, "root");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly
    /// typed config.
    ///
    /// The loader combines YAML sources with `LOOKOUT_`-prefixed environment
    /// variables and expands `${VAR}` placeholders before materialising
    /// strongly typed structs.
    pub fn load(self) -> Result<LookoutConfig, ConfigError> {
        let cfg = self.builder.build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        // Recursively expand environment variables
        expand_env_in_value(&mut v);

        let typed: LookoutConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Load(e.to_string()))?;

        Ok(typed)
    }
}

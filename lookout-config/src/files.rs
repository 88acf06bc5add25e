//! Snapshot of the four editable data files, shared across the server.
//!
//! The whole snapshot lives behind one `RwLock` and is replaced piecewise
//! but wholesale: the watcher reloads a changed file into a fresh value and
//! swaps it in, it never mutates a live one (no fine-grained locking).

use crate::credentials::NamedValues;
use crate::{ConfigError, ProxiedDomains, WebsiteCatalog};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const API_KEYS_FILE: &str = "api_keys.env";
pub const SEARCH_ENGINES_FILE: &str = "search_engines.env";
pub const WEBSITES_FILE: &str = "websites.yaml";
pub const PROXIED_DOMAINS_FILE: &str = "proxied_domains.txt";

/// Absolute locations of the data files.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub api_keys: PathBuf,
    pub search_engines: PathBuf,
    pub websites: PathBuf,
    pub proxied_domains: PathBuf,
}

impl DataPaths {
    pub fn under(data_dir: &Path) -> Self {
        Self {
            api_keys: data_dir.join(API_KEYS_FILE),
            search_engines: data_dir.join(SEARCH_ENGINES_FILE),
            websites: data_dir.join(WEBSITES_FILE),
            proxied_domains: data_dir.join(PROXIED_DOMAINS_FILE),
        }
    }
}

/// In-memory image of the data files.
#[derive(Debug, Clone, Default)]
pub struct DataFiles {
    pub api_keys: NamedValues,
    pub search_engines: NamedValues,
    pub catalog: WebsiteCatalog,
    pub proxied_domains: ProxiedDomains,
}

impl DataFiles {
    /// Load every data file. Missing files degrade to empty per-file; only
    /// unreadable or malformed files fail the load.
    pub fn load(paths: &DataPaths) -> Result<Self, ConfigError> {
        Ok(Self {
            api_keys: NamedValues::load(&paths.api_keys)?,
            search_engines: NamedValues::load(&paths.search_engines)?,
            catalog: WebsiteCatalog::load(&paths.websites)?,
            proxied_domains: ProxiedDomains::load(&paths.proxied_domains)?,
        })
    }
}

/// Shared handle used by the server and the watcher.
pub type SharedData = Arc<RwLock<DataFiles>>;

pub fn shared(data: DataFiles) -> SharedData {
    Arc::new(RwLock::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_files_is_all_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataFiles::load(&DataPaths::under(dir.path())).unwrap();
        assert!(data.api_keys.is_empty());
        assert!(data.search_engines.is_empty());
        assert!(data.catalog.is_empty());
        assert!(data.proxied_domains.is_empty());
    }

    #[test]
    fn load_picks_up_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(API_KEYS_FILE), "'k1'='v1'\n").unwrap();
        std::fs::write(dir.path().join(PROXIED_DOMAINS_FILE), "a.com\n").unwrap();
        let data = DataFiles::load(&DataPaths::under(dir.path())).unwrap();
        assert_eq!(data.api_keys.len(), 1);
        assert!(data.proxied_domains.contains("a.com"));
    }
}

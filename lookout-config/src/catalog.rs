//! Website catalog for the previewer tab (`websites.yaml`).
//!
//! Categories of {title, link, proxy flag}, served read-only and reloaded
//! wholesale on file change. Entries missing a title or link are skipped
//! with a warning instead of failing the whole reload, so one sloppy row
//! cannot take the previewer down.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebsiteCatalog {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub sites: Vec<Site>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub title: String,
    pub link: String,
    /// Whether previews of this site must go through the proxy cache.
    pub proxy_required: bool,
}

// Raw shapes are permissive; validation happens in `from_raw`.
#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    categories: Vec<RawCategory>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    name: String,
    #[serde(default)]
    sites: Vec<RawSite>,
}

#[derive(Debug, Deserialize)]
struct RawSite {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    proxy: bool,
}

impl WebsiteCatalog {
    /// Load from disk. Missing file means the previewer is simply disabled:
    /// an empty catalog is returned and a warning logged.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(file = %path.display(), "website catalog missing, previewer disabled");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(file_label: &str, text: &str) -> Result<Self, ConfigError> {
        let raw: RawCatalog = serde_yaml::from_str(text).map_err(|e| ConfigError::Malformed {
            file: file_label.to_string(),
            line: e.location().map(|l| l.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawCatalog) -> Self {
        let categories = raw
            .categories
            .into_iter()
            .map(|c| {
                let sites = c
                    .sites
                    .into_iter()
                    .filter_map(|s| match (s.title, s.link) {
                        (Some(title), Some(link))
                            if !title.trim().is_empty() && !link.trim().is_empty() =>
                        {
                            Some(Site {
                                title: title.trim().to_string(),
                                link: link.trim().to_string(),
                                proxy_required: s.proxy,
                            })
                        }
                        _ => {
                            tracing::warn!(category = %c.name, "skipping catalog entry without title/link");
                            None
                        }
                    })
                    .collect();
                Category {
                    name: c.name,
                    sites,
                }
            })
            .collect();
        Self { categories }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

//! Proxied-domain opt-in list (`proxied_domains.txt`).
//!
//! One domain per line. Only domains listed here are ever fetched and
//! cached by the previewer proxy; a change to this file invalidates the
//! page cache wholesale.

use crate::ConfigError;
use crate::credentials::ChangeSet;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxiedDomains {
    domains: Vec<String>,
}

impl ProxiedDomains {
    pub fn parse(text: &str) -> Self {
        let domains = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.to_ascii_lowercase())
            .collect();
        Self { domains }
    }

    /// Load from disk; a missing file disables proxying (empty list).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(file = %path.display(), "proxied-domain list missing, proxying disabled");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Whether `host` (or a parent domain of it) is opted into proxying.
    pub fn contains(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        self.domains.iter().any(|d| {
            let d = d.strip_prefix("www.").unwrap_or(d);
            host == d || host.ends_with(&format!(".{d}"))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Apply the list flavour of a [`ChangeSet`]: values are ignored, only
    /// names (domains) matter. Order preserved, adds appended.
    pub fn apply(&self, changes: &ChangeSet) -> Result<Self, ConfigError> {
        for name in &changes.delete {
            if !self.domains.iter().any(|d| d == name) {
                return Err(ConfigError::UnknownName(name.clone()));
            }
        }
        for upd in &changes.update {
            if !self.domains.iter().any(|d| d == &upd.original) {
                return Err(ConfigError::UnknownName(upd.original.clone()));
            }
        }

        let mut domains: Vec<String> = self
            .domains
            .iter()
            .filter(|d| !changes.delete.iter().any(|del| &del == d))
            .map(|d| {
                changes
                    .update
                    .iter()
                    .find(|u| &u.original == d)
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| d.clone())
            })
            .collect();
        for add in &changes.add {
            domains.push(add.name.clone());
        }
        domains = domains
            .into_iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Ok(Self { domains })
    }

    /// Tempfile-then-rename write, same discipline as the credential files.
    pub fn store(&self, path: &Path) -> Result<(), ConfigError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        for domain in &self.domains {
            writeln!(tmp, "{domain}").map_err(io_err)?;
        }
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{AddChange, UpdateChange};

    #[test]
    fn parse_skips_blanks_and_comments() {
        let d = ProxiedDomains::parse("example.com\n\n# note\narchive.example.org\n");
        assert_eq!(d.len(), 2);
        assert!(d.contains("example.com"));
    }

    #[test]
    fn contains_matches_subdomains_and_www() {
        let d = ProxiedDomains::parse("example.com\n");
        assert!(d.contains("www.example.com"));
        assert!(d.contains("news.example.com"));
        assert!(!d.contains("example.org"));
        assert!(!d.contains("notexample.com"));
    }

    #[test]
    fn apply_renames_in_place() {
        let d = ProxiedDomains::parse("a.com\nb.com\nc.com\n");
        let next = d
            .apply(&ChangeSet {
                update: vec![UpdateChange {
                    original: "b.com".into(),
                    name: "B.example".into(),
                    value: None,
                }],
                add: vec![AddChange {
                    name: "d.com".into(),
                    value: String::new(),
                }],
                delete: vec!["a.com".into()],
            })
            .unwrap();
        let all: Vec<_> = next.iter().collect();
        assert_eq!(all, vec!["b.example", "c.com", "d.com"]);
    }

    #[test]
    fn apply_unknown_domain_is_an_error() {
        let d = ProxiedDomains::parse("a.com\n");
        let err = d.apply(&ChangeSet {
            delete: vec!["zzz.com".into()],
            ..Default::default()
        });
        assert!(matches!(err, Err(ConfigError::UnknownName(_))));
    }

    #[test]
    fn store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxied_domains.txt");
        let d = ProxiedDomains::parse("a.com\nb.com\n");
        d.store(&path).unwrap();
        assert_eq!(ProxiedDomains::load(&path).unwrap(), d);
    }
}

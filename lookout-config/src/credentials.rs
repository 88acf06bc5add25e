//! Named-value credential files (`api_keys.env`, `search_engines.env`).
//!
//! One entry per line, `'NAME'='value'`, order significant: rotation walks
//! API keys in file order, so operators rank keys simply by reordering
//! lines. Names are unique within a file; a duplicate is a parse error
//! rather than a silent override.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// An ordered set of uniquely named values, round-trippable to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedValues {
    entries: Vec<(String, String)>,
}

impl NamedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the quoted-pair file format. Blank lines and `#` comments are
    /// skipped. Quotes around name and value are optional on read but always
    /// written back.
    pub fn parse(file_label: &str, text: &str) -> Result<Self, ConfigError> {
        let mut out = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once('=').ok_or_else(|| ConfigError::Malformed {
                file: file_label.to_string(),
                line: idx + 1,
                reason: "expected 'NAME'='value'".to_string(),
            })?;
            let name = unquote(name);
            let value = unquote(value);
            if name.is_empty() {
                return Err(ConfigError::Malformed {
                    file: file_label.to_string(),
                    line: idx + 1,
                    reason: "empty name".to_string(),
                });
            }
            out.push(name, value)?;
        }
        Ok(out)
    }

    /// Load from disk. A missing file yields the empty set: credential files
    /// may not exist yet on a fresh install.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let label = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&label, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(file = %label, "credential file missing, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Append an entry, enforcing name uniqueness.
    pub fn push(&mut self, name: String, value: String) -> Result<(), ConfigError> {
        if self.get(&name).is_some() {
            return Err(ConfigError::DuplicateName(name));
        }
        self.entries.push((name, value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry in file order, if any.
    pub fn first(&self) -> Option<(&str, &str)> {
        self.entries.first().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Apply a change set: deletions, then in-place renames/value updates
    /// (position preserved), then appends. The whole set is validated before
    /// anything is mutated so a bad change leaves the file untouched.
    pub fn apply(&self, changes: &ChangeSet) -> Result<Self, ConfigError> {
        for name in &changes.delete {
            if self.get(name).is_none() {
                return Err(ConfigError::UnknownName(name.clone()));
            }
        }
        for upd in &changes.update {
            if self.get(&upd.original).is_none() {
                return Err(ConfigError::UnknownName(upd.original.clone()));
            }
        }

        let mut next = Self::new();
        for (name, value) in &self.entries {
            if changes.delete.iter().any(|d| d == name) {
                continue;
            }
            if let Some(upd) = changes.update.iter().find(|u| &u.original == name) {
                let new_value = upd
                    .value
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .unwrap_or(value);
                next.push(upd.name.clone(), new_value.to_string())?;
            } else {
                next.push(name.clone(), value.clone())?;
            }
        }
        for add in &changes.add {
            next.push(add.name.clone(), add.value.clone())?;
        }
        Ok(next)
    }

    /// Write back to disk through a tempfile-then-rename so a crashed write
    /// never truncates a live data file.
    pub fn store(&self, path: &Path) -> Result<(), ConfigError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        for (name, value) in &self.entries {
            writeln!(tmp, "'{}'='{}'", name, value).map_err(io_err)?;
        }
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn unquote(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

/// Edit operations accepted by the admin routes, applied to a credential
/// file or (subset: add/rename/delete) to the proxied-domain list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub add: Vec<AddChange>,
    #[serde(default)]
    pub update: Vec<UpdateChange>,
    #[serde(default)]
    pub delete: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddChange {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateChange {
    /// Name of the existing entry.
    pub original: String,
    /// New name (same as `original` when only the value changes).
    pub name: String,
    /// New value; `None` or empty keeps the existing value.
    #[serde(default)]
    pub value: Option<String>,
}

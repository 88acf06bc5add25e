//! File-backed page store: one JSON entry per cached page.
//!
//! The filename is the blake3 key of the normalized URL, so lookups are a
//! single read and invalidation is a directory sweep. Entries carry the
//! original URL and a checksum so a corrupted or hash-colliding file can be
//! detected instead of silently served.

use crate::CacheError;
use crate::normalize::{cache_key, normalize_url};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// Normalized URL this entry was stored under.
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
    /// blake3 hex of `html`.
    pub checksum: String,
}

impl CachedPage {
    pub fn new(url: &Url, html: String) -> Self {
        let checksum = blake3::hash(html.as_bytes()).to_hex().to_string();
        Self {
            url: normalize_url(url),
            html,
            fetched_at: Utc::now(),
            checksum,
        }
    }
}

pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Fetch the stored entry for `url`, if any. Corrupt entries are
    /// removed and reported as a miss.
    pub fn lookup(&self, url: &Url) -> Option<CachedPage> {
        let normalized = normalize_url(url);
        let key = cache_key(&normalized);
        let path = self.entry_path(&key);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CachedPage>(&text) {
            Ok(page) if page.url == normalized => Some(page),
            Ok(_) | Err(_) => {
                tracing::warn!(key = %key, "dropping corrupt cache entry");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    pub fn store(&self, page: &CachedPage) -> Result<(), CacheError> {
        let key = cache_key(&page.url);
        let path = self.entry_path(&key);
        let json = serde_json::to_string(page).map_err(|e| CacheError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        write_atomically(&path, json.as_bytes())?;
        tracing::debug!(key = %key, url = %page.url, bytes = page.html.len(), "page cached");
        Ok(())
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn invalidate_all(&self) -> Result<usize, CacheError> {
        let mut dropped = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                std::fs::remove_file(entry.path())?;
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::info!(dropped, "page cache invalidated");
        }
        Ok(dropped)
    }

    pub fn len(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

//! Preview proxy cache.
//!
//! Pages of domains opted into proxying are fetched once and stored as JSON
//! entries keyed by the normalized URL, then served from disk until the
//! proxied-domain file changes and the cache is invalidated wholesale.
//!
//! - `normalize`: URL normalization and cache-key derivation
//! - `fetcher`: page-fetch seam (trait) + HTTP implementation
//! - `store`: the file-backed entry store
//! - `preview`: the policy layer tying eligibility, cache, and fetch together

pub mod fetcher;
pub mod normalize;
pub mod preview;
pub mod store;

pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use normalize::{cache_key, normalize_url};
pub use preview::Previewer;
pub use store::{CachedPage, PageCache};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("domain '{0}' is not opted into proxying")]
    NotProxied(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

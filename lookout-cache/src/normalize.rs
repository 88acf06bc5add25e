//! URL normalization and cache-key derivation.
//!
//! Two spellings of the same page must land on the same cache entry, so the
//! key is derived from a normalized form: lowercased scheme and host (the
//! `url` crate guarantees both), default port dropped, fragment dropped, a
//! bare `/` path collapsed. The query string is preserved, since different
//! query strings are different pages.

use url::Url;

/// Canonical string form of a URL for cache-key purposes.
pub fn normalize_url(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);

    let host = u.host_str().unwrap_or_default();
    let port = match u.port() {
        // `Url::port` is `None` when the port equals the scheme default.
        Some(p) => format!(":{p}"),
        None => String::new(),
    };
    let path = if u.path() == "/" { "" } else { u.path() };
    let query = match u.query() {
        Some(q) if !q.is_empty() => format!("?{q}"),
        _ => String::new(),
    };

    format!("{}://{}{}{}{}", u.scheme(), host, port, path, query)
}

/// Filename-safe cache key: blake3 hex of the normalized URL.
pub fn cache_key(normalized: &str) -> String {
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

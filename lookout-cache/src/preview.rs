//! Policy layer: eligibility check, cache consult, fetch, stale fallback.

use crate::fetcher::PageFetcher;
use crate::store::{CachedPage, PageCache};
use crate::CacheError;
use lookout_config::ProxiedDomains;
use url::Url;

pub struct Previewer {
    cache: PageCache,
    fetcher: Box<dyn PageFetcher>,
}

impl Previewer {
    pub fn new(cache: PageCache, fetcher: Box<dyn PageFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Serve `raw_url` through the proxy cache.
    ///
    /// Only domains present in `domains` are eligible. A cached entry is
    /// served as-is unless `refresh` is set; a refresh that fails falls
    /// back to the stale copy when one exists.
    pub async fn preview(
        &self,
        raw_url: &str,
        domains: &ProxiedDomains,
        refresh: bool,
    ) -> Result<CachedPage, CacheError> {
        let url =
            Url::parse(raw_url).map_err(|_| CacheError::InvalidUrl(raw_url.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| CacheError::InvalidUrl(raw_url.to_string()))?
            .to_string();
        if !domains.contains(&host) {
            return Err(CacheError::NotProxied(host));
        }

        let cached = self.cache.lookup(&url);
        if let (Some(page), false) = (&cached, refresh) {
            tracing::debug!(url = %page.url, "preview served from cache");
            return Ok(page.clone());
        }

        match self.fetcher.fetch(&url).await {
            Ok(html) => {
                let page = CachedPage::new(&url, html);
                self.cache.store(&page)?;
                Ok(page)
            }
            Err(e) => match cached {
                Some(stale) => {
                    tracing::warn!(url = %stale.url, error = %e, "fetch failed, serving stale copy");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }
}

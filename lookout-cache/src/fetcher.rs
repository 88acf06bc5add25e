//! Page acquisition seam.
//!
//! The cache only needs "URL in, HTML out", expressed as a trait so the
//! HTTP implementation can be swapped for a browser-backed capturer (or a
//! canned fake in tests) without touching cache logic.

use crate::CacheError;
use lookout_http::{HttpClient, RequestOpts};
use std::time::Duration;
use url::Url;

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, CacheError>;
}

/// Plain-HTTP fetcher used in production.
pub struct HttpPageFetcher {
    http: HttpClient,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, CacheError> {
        // The base is never used: every fetch passes an absolute URL.
        let http = HttpClient::new("https://localhost/")
            .map_err(|e| CacheError::Fetch(e.to_string()))?;
        Ok(Self {
            http,
            timeout: Duration::from_secs(20),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, CacheError> {
        self.http
            .get_text(
                url.as_str(),
                RequestOpts {
                    allow_absolute: true,
                    timeout: Some(self.timeout),
                    retries: Some(1),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| CacheError::Fetch(e.to_string()))
    }
}

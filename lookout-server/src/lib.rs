//! HTTP serving layer: state, sessions, rate limiting, and the routes.

pub mod admin;
pub mod rate;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::build_router;
pub use state::ServerState;

use lookout_cache::Previewer;
use lookout_config::DataChange;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Invalidate the page cache whenever the proxied-domain file changes.
/// Other data files reload in place and need no cache action.
pub fn spawn_cache_invalidator(
    mut rx: broadcast::Receiver<DataChange>,
    previewer: Arc<Previewer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(DataChange::ProxiedDomains) => {
                    if let Err(e) = previewer.cache().invalidate_all() {
                        tracing::error!(error = %e, "cache invalidation failed");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Missed events: the proxied list may have changed, so
                    // invalidate to stay on the safe side.
                    tracing::warn!(missed = n, "watcher events lagged, invalidating cache");
                    if let Err(e) = previewer.cache().invalidate_all() {
                        tracing::error!(error = %e, "cache invalidation failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Bind and serve until ctrl-c.
pub async fn run_server(state: ServerState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.config.server.bind.parse()?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_cache::{CacheError, CachedPage, PageCache, PageFetcher};
    use std::time::Duration;
    use url::Url;

    struct NeverFetcher;

    #[async_trait::async_trait]
    impl PageFetcher for NeverFetcher {
        async fn fetch(&self, _url: &Url) -> Result<String, CacheError> {
            Err(CacheError::Fetch("not in this test".into()))
        }
    }

    #[tokio::test]
    async fn proxied_domain_changes_empty_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::new(dir.path()).unwrap();
        let url = Url::parse("https://site.example/page").unwrap();
        cache
            .store(&CachedPage::new(&url, "<html>old</html>".into()))
            .unwrap();

        let previewer = Arc::new(Previewer::new(cache, Box::new(NeverFetcher)));
        let (tx, _rx) = broadcast::channel(4);
        let handle = spawn_cache_invalidator(tx.subscribe(), previewer.clone());

        // Unrelated changes leave the cache alone.
        tx.send(DataChange::Catalog).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(previewer.cache().len(), 1);

        tx.send(DataChange::ProxiedDomains).unwrap();
        for _ in 0..100 {
            if previewer.cache().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(previewer.cache().is_empty());
        handle.abort();
    }
}

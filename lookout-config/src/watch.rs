//! Polling file watcher for the data files.
//!
//! A single background task polls the mtimes of the four data files at a
//! fixed interval. When one changes (including appearing or disappearing),
//! that file is reloaded wholesale into the shared snapshot and a typed
//! [`DataChange`] event is broadcast so interested parties, the page cache
//! in particular, can react. A reload that fails to parse keeps the
//! previous snapshot and logs the error; a broken edit must not take the
//! server down.

use crate::files::{DataFiles, DataPaths, SharedData};
use crate::{NamedValues, ProxiedDomains, WebsiteCatalog};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Which data file changed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChange {
    ApiKeys,
    SearchEngines,
    Catalog,
    ProxiedDomains,
}

impl std::fmt::Display for DataChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataChange::ApiKeys => write!(f, "api_keys"),
            DataChange::SearchEngines => write!(f, "search_engines"),
            DataChange::Catalog => write!(f, "catalog"),
            DataChange::ProxiedDomains => write!(f, "proxied_domains"),
        }
    }
}

#[derive(Default)]
struct Mtimes {
    api_keys: Option<SystemTime>,
    search_engines: Option<SystemTime>,
    websites: Option<SystemTime>,
    proxied_domains: Option<SystemTime>,
}

fn mtime(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Spawn the watcher task. Returns the broadcast sender (subscribe for
/// change events) and the task handle.
pub fn spawn_watcher(
    paths: DataPaths,
    interval: Duration,
    data: SharedData,
) -> (broadcast::Sender<DataChange>, JoinHandle<()>) {
    let (tx, _) = broadcast::channel(16);
    let sender = tx.clone();

    // Seed with the state at spawn time, before the task runs, so startup
    // does not emit a spurious change for every pre-existing file and an
    // edit racing the spawn is still observed.
    let mut seen = Mtimes {
        api_keys: mtime(&paths.api_keys),
        search_engines: mtime(&paths.search_engines),
        websites: mtime(&paths.websites),
        proxied_domains: mtime(&paths.proxied_domains),
    };

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            poll_one(
                &paths.api_keys,
                &mut seen.api_keys,
                DataChange::ApiKeys,
                &data,
                &sender,
            );
            poll_one(
                &paths.search_engines,
                &mut seen.search_engines,
                DataChange::SearchEngines,
                &data,
                &sender,
            );
            poll_one(
                &paths.websites,
                &mut seen.websites,
                DataChange::Catalog,
                &data,
                &sender,
            );
            poll_one(
                &paths.proxied_domains,
                &mut seen.proxied_domains,
                DataChange::ProxiedDomains,
                &data,
                &sender,
            );
        }
    });

    (tx, handle)
}

fn poll_one(
    path: &std::path::Path,
    seen: &mut Option<SystemTime>,
    kind: DataChange,
    data: &SharedData,
    sender: &broadcast::Sender<DataChange>,
) {
    let now = mtime(path);
    if now == *seen {
        return;
    }
    *seen = now;

    match reload(path, kind, data) {
        Ok(()) => {
            tracing::info!(file = %path.display(), change = %kind, "data file reloaded");
            // No receivers is fine (e.g., proxying disabled).
            let _ = sender.send(kind);
        }
        Err(e) => {
            tracing::error!(file = %path.display(), change = %kind, error = %e, "reload failed, keeping previous snapshot");
        }
    }
}

fn reload(path: &std::path::Path, kind: DataChange, data: &SharedData) -> crate::ConfigResult {
    match kind {
        DataChange::ApiKeys => {
            let fresh = NamedValues::load(path)?;
            data.write().expect("data lock poisoned").api_keys = fresh;
        }
        DataChange::SearchEngines => {
            let fresh = NamedValues::load(path)?;
            data.write().expect("data lock poisoned").search_engines = fresh;
        }
        DataChange::Catalog => {
            let fresh = WebsiteCatalog::load(path)?;
            data.write().expect("data lock poisoned").catalog = fresh;
        }
        DataChange::ProxiedDomains => {
            let fresh = ProxiedDomains::load(path)?;
            data.write().expect("data lock poisoned").proxied_domains = fresh;
        }
    }
    Ok(())
}

/// Reload everything once, outside the watcher. Used at startup and by the
/// admin routes after a successful file rewrite so callers observe their
/// own writes immediately instead of waiting one poll interval.
pub fn reload_all(paths: &DataPaths, data: &SharedData) -> crate::ConfigResult {
    let fresh = DataFiles::load(paths)?;
    *data.write().expect("data lock poisoned") = fresh;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{API_KEYS_FILE, PROXIED_DOMAINS_FILE, shared};
    use tokio::time::timeout;

    #[tokio::test]
    async fn watcher_reloads_changed_file_and_broadcasts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::under(dir.path());
        let data = shared(DataFiles::load(&paths).unwrap());

        let (tx, handle) = spawn_watcher(paths, Duration::from_millis(10), data.clone());
        let mut rx = tx.subscribe();

        std::fs::write(dir.path().join(API_KEYS_FILE), "'fresh'='KEY'\n").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher never fired")
            .unwrap();
        assert_eq!(event, DataChange::ApiKeys);
        assert_eq!(
            data.read().unwrap().api_keys.get("fresh"),
            Some("KEY")
        );
        handle.abort();
    }

    #[tokio::test]
    async fn bad_edit_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(API_KEYS_FILE), "'good'='K'\n").unwrap();
        let paths = DataPaths::under(dir.path());
        let data = shared(DataFiles::load(&paths).unwrap());

        let (tx, handle) = spawn_watcher(paths, Duration::from_millis(10), data.clone());
        let mut rx = tx.subscribe();

        // Duplicate names fail the parse; the old snapshot must survive.
        std::fs::write(
            dir.path().join(API_KEYS_FILE),
            "'dup'='1'\n'dup'='2'\n",
        )
        .unwrap();
        // Touch a second file so we have a deterministic "watcher ran" signal.
        std::fs::write(dir.path().join(PROXIED_DOMAINS_FILE), "x.com\n").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher never fired")
            .unwrap();
        assert_eq!(event, DataChange::ProxiedDomains);
        assert_eq!(data.read().unwrap().api_keys.get("good"), Some("K"));
        handle.abort();
    }

    #[tokio::test]
    async fn reload_all_replaces_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::under(dir.path());
        let data = shared(DataFiles::default());
        std::fs::write(dir.path().join(PROXIED_DOMAINS_FILE), "a.com\n").unwrap();
        reload_all(&paths, &data).unwrap();
        assert!(data.read().unwrap().proxied_domains.contains("a.com"));
    }
}

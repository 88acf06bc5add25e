use anyhow::Result;
use clap::Parser;
use lookout_cache::{HttpPageFetcher, PageCache, Previewer};
use lookout_common::observability::{init_logging, LogConfig, LogFormat};
use lookout_config::files::{shared, DataFiles, DataPaths};
use lookout_config::{spawn_watcher, LookoutConfigLoader};
use lookout_search::CseClient;
use lookout_server::rate::RateLimiter;
use lookout_server::session::SessionStore;
use lookout_server::{run_server, spawn_cache_invalidator, ServerState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Multi-engine Custom Search front-end with domain grouping and a preview
/// proxy cache.
#[derive(Debug, Parser)]
#[command(name = "lookout", version)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "lookout.yaml", env = "LOOKOUT_CONFIG")]
    config: PathBuf,

    /// Override the bind address from the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Duplicate log output to stderr.
    #[arg(long)]
    verbose: bool,

    /// Emit JSON-encoded logs.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Load config (env wins over file).
    let mut config = LookoutConfigLoader::new().with_file(&args.config).load()?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    init_logging(LogConfig {
        app_name: "lookout",
        emit_stderr: args.verbose,
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        ..LogConfig::default()
    })?;

    // 2) Load the data files; missing ones degrade per file, they never
    //    stop the server from starting.
    let paths = DataPaths::under(&config.data_dir);
    let data = shared(DataFiles::load(&paths)?);
    {
        let snapshot = data.read().expect("data lock poisoned");
        tracing::info!(
            api_keys = snapshot.api_keys.len(),
            engines = snapshot.search_engines.len(),
            catalog_categories = snapshot.catalog.categories.len(),
            proxied_domains = snapshot.proxied_domains.len(),
            "data files loaded"
        );
        if snapshot.api_keys.is_empty() || snapshot.search_engines.is_empty() {
            tracing::warn!("no usable credential pairs, search will report unavailable");
        }
    }

    let previewer = Arc::new(Previewer::new(
        PageCache::new(&config.cache_dir)?,
        Box::new(HttpPageFetcher::new()?),
    ));

    // 3) Watch the data files and keep the cache honest.
    let (events, _watcher) = spawn_watcher(
        paths.clone(),
        Duration::from_secs(config.watch_interval_secs),
        data.clone(),
    );
    let _invalidator = spawn_cache_invalidator(events.subscribe(), previewer.clone());

    // 4) Serve.
    let session_ttl = Duration::from_secs(config.server.session_ttl_secs);
    let state = ServerState {
        config: Arc::new(config),
        paths,
        data,
        previewer,
        sessions: Arc::new(SessionStore::new(session_ttl)),
        limiter: Arc::new(RateLimiter::new()),
        client: CseClient::new()?,
        start_time: Instant::now(),
    };
    run_server(state).await
}

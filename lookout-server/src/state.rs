use axum::extract::FromRef;

use crate::rate::RateLimiter;
use crate::session::SessionStore;
use lookout_cache::Previewer;
use lookout_config::{DataPaths, LookoutConfig, SharedData};
use lookout_search::CseClient;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedPreviewer = Arc<Previewer>;
pub type GuardedSessions = Arc<SessionStore>;
pub type GuardedLimiter = Arc<RateLimiter>;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<LookoutConfig>,
    pub paths: DataPaths,
    pub data: SharedData,
    pub previewer: GuardedPreviewer,
    pub sessions: GuardedSessions,
    pub limiter: GuardedLimiter,
    pub client: CseClient,
    pub start_time: Instant,
}

impl FromRef<ServerState> for SharedData {
    fn from_ref(input: &ServerState) -> Self {
        input.data.clone()
    }
}

impl FromRef<ServerState> for GuardedPreviewer {
    fn from_ref(input: &ServerState) -> Self {
        input.previewer.clone()
    }
}

impl FromRef<ServerState> for GuardedSessions {
    fn from_ref(input: &ServerState) -> Self {
        input.sessions.clone()
    }
}

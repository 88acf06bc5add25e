//! Route handlers and router assembly.

use crate::admin;
use crate::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use crate::state::ServerState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lookout_cache::CacheError;
use lookout_common::Role;
use lookout_config::ConfigError;
use lookout_search::{
    build_pairs, group_by_domain, search_all, DomainGroup, Rotation, SearchError, SortOrder,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/engines", get(engines))
        .route("/api/search", get(search))
        .route("/api/catalog", get(catalog))
        .route("/api/preview", get(preview))
        .merge(admin::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==============================
// Error mapping
// ==============================

#[derive(Debug)]
pub enum ServerError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    RateLimited,
    /// Credential exhaustion or missing credentials: search is down.
    SearchUnavailable(String),
    /// The upstream API or a proxied site misbehaved.
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid credentials".into()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ServerError::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, "slow down".into())
            }
            ServerError::SearchUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ServerError::Upstream(m) => (StatusCode::BAD_GATEWAY, m),
            ServerError::Internal(m) => {
                tracing::error!(error = %m, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<SearchError> for ServerError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::EmptyQuery => {
                ServerError::BadRequest("no search query provided".into())
            }
            SearchError::UnknownEngine(name) => {
                ServerError::BadRequest(format!("unknown engine '{name}'"))
            }
            SearchError::NoEngines | SearchError::NoKeys => {
                ServerError::SearchUnavailable("search is not configured".into())
            }
            SearchError::CredentialsExhausted { .. } => {
                ServerError::SearchUnavailable("search temporarily unavailable".into())
            }
            SearchError::Api { message, .. } => ServerError::Upstream(message),
            SearchError::Http(e) => ServerError::Upstream(e.to_string()),
        }
    }
}

impl From<CacheError> for ServerError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::InvalidUrl(u) => ServerError::BadRequest(format!("invalid URL '{u}'")),
            CacheError::NotProxied(host) => {
                ServerError::Forbidden(format!("'{host}' is not proxied"))
            }
            CacheError::Fetch(m) => ServerError::Upstream(m),
            CacheError::Io(e) => ServerError::Internal(e.to_string()),
            CacheError::Corrupt { reason, .. } => ServerError::Internal(reason),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::DuplicateName(_)
            | ConfigError::UnknownName(_)
            | ConfigError::Malformed { .. } => ServerError::BadRequest(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

// ==============================
// Home
// ==============================

#[derive(Serialize)]
struct ServerStats {
    uptime: String,
    role: Option<Role>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        role: session.map(|s| s.role),
    };
    Json(stats)
}

// ==============================
// Auth
// ==============================

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub user: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    role: Role,
}

async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<LoginSuccessResponse>), ServerError> {
    let rate = state.config.server.rate;
    if !state.limiter.allow(
        &format!("login:{}", body.user),
        rate.login_per_minute,
        rate.burst,
    ) {
        return Err(ServerError::RateLimited);
    }

    let auth = &state.config.auth;
    let role = if body.user == auth.admin.user && body.password == auth.admin.password {
        Role::Admin
    } else if body.user == auth.employee.user && body.password == auth.employee.password {
        Role::Employee
    } else {
        tracing::warn!(user = %body.user, "failed login attempt");
        return Err(ServerError::Unauthorized);
    };

    let token = state.sessions.issue(role);
    tracing::info!(user = %body.user, %role, "login");
    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    Ok((jar.add(cookie), Json(LoginSuccessResponse { token, role })))
}

async fn logout(
    session: Session,
    State(state): State<ServerState>,
    jar: CookieJar,
) -> impl IntoResponse {
    state.sessions.revoke(&session.token);
    let jar = jar.remove(Cookie::from(COOKIE_SESSION_TOKEN_KEY));
    (jar, StatusCode::NO_CONTENT)
}

// ==============================
// Search
// ==============================

#[derive(Deserialize, Debug)]
struct SearchParams {
    q: Option<String>,
    engine: Option<String>,
    sort: Option<String>,
    /// 1-based start index; present means "this one page", absent means
    /// "fan out over every page".
    start: Option<u32>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    engine: String,
    total_results: u64,
    search_time: f64,
    next_start: Option<u32>,
    groups: Vec<DomainGroup>,
}

async fn search(
    session: Session,
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServerError> {
    let rate = state.config.server.rate;
    if !state
        .limiter
        .allow(&session.token, rate.search_per_minute, rate.burst)
    {
        return Err(ServerError::RateLimited);
    }

    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery.into());
    }
    let sort = SortOrder::parse(params.sort.as_deref().unwrap_or(""));

    let snapshot = state.data.read().expect("data lock poisoned").clone();
    let pairs = build_pairs(&snapshot, params.engine.as_deref())?;
    let engine = pairs[0].engine_name.clone();

    let page = match params.start {
        Some(start) if start >= 1 => {
            let rotation = Rotation::new(&state.client, &pairs);
            let (_, page) = rotation.search_page(&query, start, sort).await?;
            page
        }
        _ => {
            search_all(
                &state.client,
                &pairs,
                &query,
                sort,
                state.config.search.max_pages,
            )
            .await?
        }
    };

    Ok(Json(SearchResponse {
        query,
        engine,
        total_results: page.total_results,
        search_time: page.search_time,
        next_start: page.next_start,
        groups: group_by_domain(&page.results),
    }))
}

async fn engines(
    _session: Session,
    State(state): State<ServerState>,
) -> Json<Vec<String>> {
    let snapshot = state.data.read().expect("data lock poisoned");
    Json(snapshot.search_engines.names().map(String::from).collect())
}

// ==============================
// Catalog & preview
// ==============================

async fn catalog(
    _session: Session,
    State(state): State<ServerState>,
) -> Json<lookout_config::WebsiteCatalog> {
    let snapshot = state.data.read().expect("data lock poisoned");
    Json(snapshot.catalog.clone())
}

#[derive(Deserialize, Debug)]
struct PreviewParams {
    url: String,
    #[serde(default)]
    refresh: Option<String>,
}

async fn preview(
    session: Session,
    State(state): State<ServerState>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<lookout_cache::CachedPage>, ServerError> {
    let rate = state.config.server.rate;
    if !state
        .limiter
        .allow(&session.token, rate.search_per_minute, rate.burst)
    {
        return Err(ServerError::RateLimited);
    }

    let refresh = params
        .refresh
        .as_deref()
        .is_some_and(|v| matches!(v, "1" | "true" | "yes"));
    let domains = state
        .data
        .read()
        .expect("data lock poisoned")
        .proxied_domains
        .clone();

    let page = state.previewer.preview(&params.url, &domains, refresh).await?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formats_days_and_zero_padding() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 03:04:05"
        );
    }
}

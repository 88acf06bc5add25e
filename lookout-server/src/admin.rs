//! Admin-only routes: edit the credential files and the proxied-domain
//! list. Every edit is validated, written through a tempfile rename, and
//! reloaded into the shared snapshot immediately so the caller observes its
//! own write without waiting for the next watcher poll.

use crate::routes::ServerError;
use crate::session::AdminSession;
use crate::state::ServerState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use lookout_config::credentials::NamedValues;
use lookout_config::{watch, ChangeSet, ProxiedDomains};
use serde::Serialize;
use std::path::PathBuf;

pub fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/admin/credentials/{kind}",
            get(get_credentials).put(put_credentials),
        )
        .route(
            "/api/admin/proxied-domains",
            get(get_domains).put(put_domains),
        )
}

#[derive(Serialize)]
struct EntryOut {
    name: String,
    value: String,
}

fn credential_path(state: &ServerState, kind: &str) -> Result<PathBuf, ServerError> {
    match kind {
        "keys" => Ok(state.paths.api_keys.clone()),
        "engines" => Ok(state.paths.search_engines.clone()),
        other => Err(ServerError::BadRequest(format!(
            "unknown credential kind '{other}'"
        ))),
    }
}

async fn get_credentials(
    _admin: AdminSession,
    State(state): State<ServerState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<EntryOut>>, ServerError> {
    let path = credential_path(&state, &kind)?;
    let values = NamedValues::load(&path)?;
    Ok(Json(
        values
            .iter()
            .map(|(name, value)| EntryOut {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
    ))
}

async fn put_credentials(
    _admin: AdminSession,
    State(state): State<ServerState>,
    Path(kind): Path<String>,
    Json(changes): Json<ChangeSet>,
) -> Result<Json<Vec<String>>, ServerError> {
    let path = credential_path(&state, &kind)?;

    // Disk is the source of truth: load fresh so a concurrent external edit
    // is not clobbered by a stale in-memory copy.
    let current = NamedValues::load(&path)?;
    let next = current.apply(&changes)?;
    next.store(&path)?;
    watch::reload_all(&state.paths, &state.data)?;

    tracing::info!(kind = %kind, entries = next.len(), "credential file updated");
    Ok(Json(next.names().map(String::from).collect()))
}

async fn get_domains(
    _admin: AdminSession,
    State(state): State<ServerState>,
) -> Result<Json<Vec<String>>, ServerError> {
    let domains = ProxiedDomains::load(&state.paths.proxied_domains)?;
    Ok(Json(domains.iter().map(String::from).collect()))
}

async fn put_domains(
    _admin: AdminSession,
    State(state): State<ServerState>,
    Json(changes): Json<ChangeSet>,
) -> Result<Json<Vec<String>>, ServerError> {
    let current = ProxiedDomains::load(&state.paths.proxied_domains)?;
    let next = current.apply(&changes)?;
    next.store(&state.paths.proxied_domains)?;
    watch::reload_all(&state.paths, &state.data)?;

    // The watcher will notice the rewrite too, but invalidate now so the
    // next preview already sees the new policy.
    state.previewer.cache().invalidate_all()?;

    tracing::info!(domains = next.len(), "proxied-domain list updated");
    Ok(Json(next.iter().map(String::from).collect()))
}

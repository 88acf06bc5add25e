//! Cookie/header session handling.
//!
//! Tokens are opaque UUIDs held in an in-memory store with a sliding idle
//! TTL. A request may present its token either as the `session_token`
//! cookie or in the `Authorization` header; the extractor checks both,
//! cookie first.

use crate::state::ServerState;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use lookout_common::Role;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub role: Role,
}

struct SessionRecord {
    role: Role,
    last_used: Instant,
}

/// In-memory token store. Sessions die with the process, matching the
/// single-binary deployment model.
pub struct SessionStore {
    ttl: Duration,
    inner: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session and hand back its token.
    pub fn issue(&self, role: Role) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.insert(
            token.clone(),
            SessionRecord {
                role,
                last_used: Instant::now(),
            },
        );
        token
    }

    /// Look a token up, expiring it if idle past the TTL and refreshing its
    /// idle clock otherwise (sliding expiry).
    pub fn resolve(&self, token: &str) -> Option<Role> {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        let now = Instant::now();
        match inner.get_mut(token) {
            Some(record) if now.duration_since(record.last_used) <= self.ttl => {
                record.last_used = now;
                Some(record.role)
            }
            Some(_) => {
                inner.remove(token);
                debug!("session expired");
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.remove(token);
    }
}

pub enum SessionExtractionError {
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

async fn extract_token(parts: &mut Parts, state: &ServerState) -> Option<String> {
    let from_cookie = CookieJar::from_request_parts(parts, state)
        .await
        .ok()
        .and_then(|jar| {
            jar.get(COOKIE_SESSION_TOKEN_KEY)
                .map(|c| c.value().to_string())
        });
    from_cookie.or_else(|| {
        parts
            .headers
            .get(HEADER_SESSION_TOKEN_KEY)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_start_matches("Bearer ").to_string())
    })
}

async fn extract_session(parts: &mut Parts, state: &ServerState) -> Option<Session> {
    let token = extract_token(parts, state).await?;
    let role = state.sessions.resolve(&token)?;
    Some(Session { token, role })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session(parts, state)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session(parts, state).await)
    }
}

/// Extractor that additionally requires the admin role.
pub struct AdminSession(pub Session);

impl FromRequestParts<ServerState> for AdminSession {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let session = extract_session(parts, state)
            .await
            .ok_or(SessionExtractionError::AccessDenied)?;
        if !session.role.can_edit_files() {
            return Err(SessionExtractionError::AccessDenied);
        }
        Ok(AdminSession(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_resolve_round_trips() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.issue(Role::Employee);
        assert_eq!(store.resolve(&token), Some(Role::Employee));
    }

    #[test]
    fn unknown_and_revoked_tokens_fail() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert_eq!(store.resolve("nope"), None);
        let token = store.issue(Role::Admin);
        store.revoke(&token);
        assert_eq!(store.resolve(&token), None);
    }

    #[test]
    fn zero_ttl_sessions_expire_immediately_after_idle() {
        let store = SessionStore::new(Duration::from_nanos(0));
        let token = store.issue(Role::Admin);
        // Any elapsed time at all exceeds a zero TTL.
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(store.resolve(&token), None);
        // The expired record is gone for good.
        assert_eq!(store.resolve(&token), None);
    }
}

//! Server-side sessions.
//!
//! Flow Overview: the session layer reads the signed `session` cookie, keeps
//! the id only when it names a live entry in the in-memory [`SessionStore`],
//! and hands handlers a [`Session`] through request extensions. Entries are
//! created lazily on the first write, and [`Session::cycle`] moves the values
//! to a fresh id on login. Whenever the id changed during the request the new
//! cookie is appended to the response.
//!
//! Session ids are ULIDs; the cookie is signed with the key derived from the
//! configured session secret, so a forged or altered id is treated as absent.
//! Entries expire after the configured TTL of inactivity.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    SignedCookieJar,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, error};
use ulid::Ulid;

use super::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "session";

struct SessionEntry {
    values: HashMap<String, String>,
    expires_at: Instant,
}

impl SessionEntry {
    fn new(values: HashMap<String, String>, ttl: Duration) -> Self {
        Self {
            values,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session storage keyed by session id.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Ulid, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Refresh a presented session id. Returns `false` for unknown ids and
    /// for expired entries, which are dropped.
    pub async fn touch(&self, id: Ulid) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = now + self.ttl;
                true
            }
            Some(_) => {
                sessions.remove(&id);
                debug!("expired session discarded");
                false
            }
            None => false,
        }
    }

    /// Insert an empty session under a new id.
    pub async fn create(&self) -> Ulid {
        let id = Ulid::new();
        self.sessions
            .write()
            .await
            .insert(id, SessionEntry::new(HashMap::new(), self.ttl));
        id
    }

    /// Move the values of `old` to a new id and forget `old`. An unknown or
    /// expired `old` yields an empty session.
    pub async fn cycle(&self, old: Ulid) -> Ulid {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let values = sessions
            .remove(&old)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.values)
            .unwrap_or_default();
        let id = Ulid::new();
        sessions.insert(id, SessionEntry::new(values, self.ttl));
        id
    }

    pub async fn get(&self, id: Ulid, key: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .and_then(|entry| entry.values.get(key).cloned())
    }

    pub async fn set(&self, id: Ulid, key: &str, value: String) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(id)
            .or_insert_with(|| SessionEntry::new(HashMap::new(), self.ttl));
        entry.values.insert(key.to_string(), value);
        entry.expires_at = Instant::now() + self.ttl;
    }

    pub async fn delete(&self, id: Ulid, key: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&id) {
            entry.values.remove(key);
        }
    }

    pub async fn clear(&self, id: Ulid) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&id) {
            entry.values.clear();
        }
    }

    /// Drop expired entries; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Handle to the current request's session.
///
/// Clones share the id slot, so a rotation made by one holder is seen by the
/// session layer when it writes the cookie.
#[derive(Clone)]
pub struct Session {
    id: Arc<RwLock<Option<Ulid>>>,
    store: Arc<SessionStore>,
}

impl Session {
    #[must_use]
    pub fn new(id: Option<Ulid>, store: Arc<SessionStore>) -> Self {
        Self {
            id: Arc::new(RwLock::new(id)),
            store,
        }
    }

    /// Current id, `None` until something is written.
    pub async fn id(&self) -> Option<Ulid> {
        *self.id.read().await
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let id = self.id().await?;
        self.store.get(id, key).await
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) {
        let mut slot = self.id.write().await;
        let id = match *slot {
            Some(id) => id,
            None => {
                let id = self.store.create().await;
                *slot = Some(id);
                id
            }
        };
        self.store.set(id, key, value.into()).await;
    }

    pub async fn delete(&self, key: &str) {
        if let Some(id) = self.id().await {
            self.store.delete(id, key).await;
        }
    }

    pub async fn clear(&self) {
        if let Some(id) = self.id().await {
            self.store.clear(id).await;
        }
    }

    /// Rotate to a fresh id, keeping the values.
    pub async fn cycle(&self) -> Ulid {
        let mut slot = self.id.write().await;
        let id = match *slot {
            Some(old) => self.store.cycle(old).await,
            None => self.store.create().await,
        };
        *slot = Some(id);
        id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            error!("session extractor used on a route without the session layer");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}

/// Attach the session for this request and set the cookie when its id changed.
pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let jar = SignedCookieJar::from_headers(req.headers(), state.session_key().clone());
    let mut presented = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| Ulid::from_string(cookie.value()).ok());
    if let Some(id) = presented {
        if !state.sessions().touch(id).await {
            presented = None;
        }
    }

    let session = Session::new(presented, state.sessions().clone());
    req.extensions_mut().insert(session.clone());

    let response = next.run(req).await;

    match session.id().await {
        Some(id) if Some(id) != presented => {
            debug!(session_id = %id, "session cookie issued");
            let jar = jar.add(session_cookie(id, state.config().cookie_secure()));
            (jar, response).into_response()
        }
        _ => response,
    }
}

fn session_cookie(id: Ulid, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Periodically purge expired sessions until the task is dropped.
pub fn spawn_purge_task(store: Arc<SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                debug!(purged, "expired sessions purged");
            }
        }
    })
}

//! Per-request identity resolution.
//!
//! The login session wins; only in cookie mode, and only when the session is
//! not logged in, is the `auth` cookie consulted. A valid cookie logs the
//! session back in and caches the username. An invalid cookie ends the
//! request with a redirect to `/login` that also deletes the cookie.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{gate, login_user, session_identity, AuthCookieCodec, Identity};
use crate::api::{
    session::Session,
    state::{AppState, AuthMode},
};

/// Resolve the identity for a request.
///
/// # Errors
/// Returns the response to send instead of running the handler when the
/// presented `auth` cookie is invalid.
pub async fn resolve_identity(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
) -> Result<Option<Identity>, Response> {
    if let Some(identity) = session_identity(session).await {
        return Ok(Some(identity));
    }

    if state.config().mode() != AuthMode::Cookie {
        return Ok(None);
    }

    let Some(token) = AuthCookieCodec::token(headers) else {
        return Ok(None);
    };

    match state.cookies().restore(&token) {
        Ok(user_id) => {
            let username = gate::cached_username(state.gateway(), &user_id).await;
            login_user(session, &user_id, username.as_deref()).await;
            let session_id = session.id().await;
            debug!(session_id = ?session_id, "login restored from auth cookie");
            Ok(Some(Identity { user_id, username }))
        }
        Err(err) => {
            warn!(error = %err, "auth cookie rejected");
            Err(err.into_response())
        }
    }
}

/// Middleware attaching the resolved [`Identity`] to the request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_identity(&state, &session, req.headers()).await {
        Ok(Some(identity)) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(response) => response,
    }
}

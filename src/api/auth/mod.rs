//! Sign-in flow and identity resolution.
//!
//! Flow Overview: `/callback` hands the gateway payload to [`gate`], which
//! folds the client's errors and `success` flags into [`AuthError`]. On success
//! the login session is marked with the user id and, in cookie mode, the
//! [`AuthCookieCodec`] issues the persistent `auth` cookie. On every later
//! request [`middleware::authenticate`] resolves an [`Identity`] from the
//! session or, failing that, from the cookie.
//!
//! ## Session keys
//!
//! - `user_id`: present iff the login session is active.
//! - `username`: cached display name, absent when the gateway lookup failed.

mod cookie;
mod error;
pub(crate) mod gate;
mod identity;
pub(crate) mod middleware;

pub use cookie::{AuthCookieCodec, AUTH_COOKIE_MAX_AGE_SECONDS, AUTH_COOKIE_NAME};
pub use error::AuthError;
pub use identity::{Identity, LoginRedirect};

use super::session::Session;

pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_USERNAME: &str = "username";

/// Mark the session as logged in, replacing any cached username. Rotates the
/// session id; the pre-login id is forgotten.
pub(crate) async fn login_user(session: &Session, user_id: &str, username: Option<&str>) {
    session.cycle().await;
    session.set(SESSION_USER_ID, user_id).await;
    match username {
        Some(username) => session.set(SESSION_USERNAME, username).await,
        None => session.delete(SESSION_USERNAME).await,
    }
}

pub(crate) async fn logout_user(session: &Session) {
    session.delete(SESSION_USER_ID).await;
    session.delete(SESSION_USERNAME).await;
}

/// Identity stored in the login session, if the session is logged in.
pub(crate) async fn session_identity(session: &Session) -> Option<Identity> {
    let user_id = session
        .get(SESSION_USER_ID)
        .await
        .filter(|id| !id.is_empty())?;
    Some(Identity {
        user_id,
        username: session.get(SESSION_USERNAME).await,
    })
}

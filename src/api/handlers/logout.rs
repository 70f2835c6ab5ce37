use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::info;

use crate::api::{
    auth::{logout_user, AuthCookieCodec, Identity},
    found,
    session::Session,
    state::{AppState, AuthMode},
};

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Signed out (or not signed in), redirect to the login page")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    _identity: Identity,
) -> Response {
    logout_user(&session).await;
    let session_id = session.id().await;
    info!(session_id = ?session_id, "user signed out");

    match state.config().mode() {
        AuthMode::Session => found("/login"),
        AuthMode::Cookie => (CookieJar::new().add(AuthCookieCodec::revoke()), found("/login"))
            .into_response(),
    }
}

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use utoipa::IntoParams;

use crate::api::{
    auth::{gate, login_user, AuthError},
    found,
    session::Session,
    state::{AppState, AuthMode},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Encrypted proof of identity issued by the gateway.
    payload: Option<String>,
}

#[utoipa::path(
    get,
    path = "/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Signed in, redirect to the home page"),
        (status = 400, description = "Missing payload, or payload could not be decrypted or verified", body = String),
        (status = 401, description = "Gateway rejected the payload", body = String),
        (status = 500, description = "Auth cookie could not be issued", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AuthError> {
    let user_id = gate::authenticate_payload(state.gateway(), query.payload.as_deref())?;

    match state.config().mode() {
        AuthMode::Session => {
            login_user(&session, &user_id, None).await;
            info!(mode = %AuthMode::Session, "user signed in");
            Ok(found("/home"))
        }
        AuthMode::Cookie => {
            let cookie = state.cookies().issue(&user_id)?;
            let username = gate::cached_username(state.gateway(), &user_id).await;
            if username.is_none() {
                debug!("signed in without a username");
            }
            login_user(&session, &user_id, username.as_deref()).await;
            info!(mode = %AuthMode::Cookie, "user signed in, auth cookie issued");
            Ok((CookieJar::new().add(cookie), found("/home")).into_response())
        }
    }
}

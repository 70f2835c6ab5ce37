use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use thiserror::Error;

use super::cookie::AuthCookieCodec;
use crate::{api::found, gateway};

/// Every failure the sign-in flow can produce, normalized from the gateway's
/// mix of errors and `success` flags.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing payload")]
    MissingPayload,
    #[error("Invalid payload or verification error")]
    PayloadDecrypt(#[source] gateway::Error),
    #[error("Authentication failed")]
    VerificationFailed,
    #[error("invalid auth cookie: {0}")]
    CookieDecode(String),
    #[error("user data lookup failed")]
    UpstreamLookup(#[source] gateway::Error),
    #[error("failed to issue auth cookie")]
    CookieIssue(#[source] gateway::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingPayload | Self::PayloadDecrypt(_) => StatusCode::BAD_REQUEST,
            Self::VerificationFailed => StatusCode::UNAUTHORIZED,
            Self::CookieDecode(_) => StatusCode::FOUND,
            Self::UpstreamLookup(_) | Self::CookieIssue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            // Never surfaced: the browser is sent back to login without the cookie.
            Self::CookieDecode(_) => {
                let jar = CookieJar::new().add(AuthCookieCodec::revoke());
                (jar, found("/login")).into_response()
            }
            Self::UpstreamLookup(_) | Self::CookieIssue(_) => {
                (self.status(), "Internal server error").into_response()
            }
            Self::MissingPayload | Self::PayloadDecrypt(_) | Self::VerificationFailed => {
                (self.status(), self.to_string()).into_response()
            }
        }
    }
}

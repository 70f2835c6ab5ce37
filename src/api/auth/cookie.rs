//! Persistent `auth` cookie.
//!
//! The token itself is minted and checked by the gateway; this codec only
//! normalizes it to text and wraps it in a cookie with fixed attributes:
//! 7 days, `HttpOnly`, `Path=/`, configured `SameSite`. `Secure` is opt-in.

use axum::http::HeaderMap;
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use std::sync::Arc;

use super::AuthError;
use crate::gateway::GatewayClient;

pub const AUTH_COOKIE_NAME: &str = "auth";
pub const AUTH_COOKIE_MAX_AGE_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Clone)]
pub struct AuthCookieCodec {
    client: Arc<dyn GatewayClient>,
    same_site: SameSite,
    secure: bool,
}

impl AuthCookieCodec {
    #[must_use]
    pub fn new(client: Arc<dyn GatewayClient>, same_site: SameSite, secure: bool) -> Self {
        Self {
            client,
            same_site,
            secure,
        }
    }

    /// Mint a cookie carrying a gateway token for `user_id`.
    ///
    /// # Errors
    /// Returns `AuthError::CookieIssue` if the gateway cannot produce a text token.
    pub fn issue(&self, user_id: &str) -> Result<Cookie<'static>, AuthError> {
        let token = self
            .client
            .generate_cookie(user_id)
            .and_then(crate::gateway::CookieToken::into_string)
            .map_err(AuthError::CookieIssue)?;

        Ok(Cookie::build((AUTH_COOKIE_NAME, token))
            .path("/")
            .http_only(true)
            .same_site(self.same_site)
            .secure(self.secure)
            .max_age(time::Duration::seconds(AUTH_COOKIE_MAX_AGE_SECONDS))
            .build())
    }

    /// Decode and validate a token, returning the user id it proves.
    ///
    /// # Errors
    /// Returns `AuthError::CookieDecode` for any undecodable, forged or empty token.
    pub fn restore(&self, token: &str) -> Result<String, AuthError> {
        let claims = self
            .client
            .decrypt_cookie(token)
            .map_err(|err| AuthError::CookieDecode(err.to_string()))?;

        if claims.user_id.is_empty() {
            return Err(AuthError::CookieDecode("empty user id".to_string()));
        }

        if !self.client.validate_cookie(&claims.user_id, &claims.hash) {
            return Err(AuthError::CookieDecode("hash mismatch".to_string()));
        }

        Ok(claims.user_id)
    }

    /// Removal cookie that makes the browser drop `auth`.
    #[must_use]
    pub fn revoke() -> Cookie<'static> {
        let mut cookie = Cookie::build((AUTH_COOKIE_NAME, "")).path("/").build();
        cookie.make_removal();
        cookie
    }

    /// Raw token from the request cookies, if any.
    #[must_use]
    pub fn token(headers: &HeaderMap) -> Option<String> {
        CookieJar::from_headers(headers)
            .get(AUTH_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

//! Shared application state and auth configuration.

use axum_extra::extract::cookie::{Key, SameSite};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use std::{fmt, str::FromStr, sync::Arc, time::Duration};
use url::Url;

use super::{auth::AuthCookieCodec, session::SessionStore};
use crate::gateway::GatewayClient;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const SESSION_KEY_CONTEXT: &[u8] = b"browniegate-login.session\0";

/// How identity is carried between requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Login session only.
    Session,
    /// Login session plus the persistent `auth` cookie.
    #[default]
    Cookie,
}

impl AuthMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "cookie" => Ok(Self::Cookie),
            _ => Err(format!("invalid auth mode: {value}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    mode: AuthMode,
    authorization_url: Url,
    same_site: SameSite,
    cookie_secure: bool,
    session_ttl_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(authorization_url: Url) -> Self {
        Self {
            mode: AuthMode::default(),
            authorization_url,
            same_site: SameSite::Lax,
            cookie_secure: false,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: AuthMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    #[must_use]
    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    #[must_use]
    pub fn same_site(&self) -> SameSite {
        self.same_site
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<AuthConfig>,
    gateway: Arc<dyn GatewayClient>,
    cookies: AuthCookieCodec,
    sessions: Arc<SessionStore>,
    session_key: Key,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        gateway: Arc<dyn GatewayClient>,
        session_secret: &SecretString,
    ) -> Self {
        let cookies =
            AuthCookieCodec::new(gateway.clone(), config.same_site(), config.cookie_secure());
        let sessions = Arc::new(SessionStore::new(config.session_ttl()));
        Self {
            config: Arc::new(config),
            gateway,
            cookies,
            sessions,
            session_key: derive_session_key(session_secret),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn gateway(&self) -> &dyn GatewayClient {
        self.gateway.as_ref()
    }

    #[must_use]
    pub fn cookies(&self) -> &AuthCookieCodec {
        &self.cookies
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn session_key(&self) -> &Key {
        &self.session_key
    }
}

/// Stretch the configured secret to the 64 bytes the cookie signer needs.
fn derive_session_key(secret: &SecretString) -> Key {
    let mut hasher = Sha512::new();
    hasher.update(SESSION_KEY_CONTEXT);
    hasher.update(secret.expose_secret().as_bytes());
    Key::from(hasher.finalize().as_slice())
}

//! BrownieGate client contract.
//!
//! The gateway owns the cryptography: it decrypts and verifies the one-time
//! callback payload, mints and checks the long-lived cookie token, and serves
//! user data. The application only talks to it through [`GatewayClient`], so
//! tests swap in a stub and production uses [`BrownieClient`].
//!
//! The client reports failures two ways, mirroring the gateway SDK: hard
//! errors as [`Error`] and soft rejections as `success` flags. Handlers never
//! see either directly; `api::auth::gate` folds both into `AuthError`.

mod brownie;
mod error;

pub use brownie::{BrownieClient, BrownieConfig, DEFAULT_GATEWAY_URL};
pub use error::Error;

use async_trait::async_trait;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

/// Plaintext of a callback payload, only meaningful to the client that
/// decrypted it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedPayload(Vec<u8>);

impl DecryptedPayload {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Outcome of payload verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadVerdict {
    pub success: bool,
    pub user_id: String,
}

/// Cookie token as produced by the gateway, which may hand back either raw
/// bytes or text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CookieToken {
    Bytes(Vec<u8>),
    Text(String),
}

impl CookieToken {
    /// Normalize to a string token.
    ///
    /// # Errors
    /// Returns an error if a byte token is not valid UTF-8.
    pub fn into_string(self) -> Result<String, Error> {
        match self {
            Self::Bytes(bytes) => Ok(String::from_utf8(bytes)?),
            Self::Text(text) => Ok(text),
        }
    }
}

/// Contents of a decrypted cookie token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieClaims {
    pub user_id: String,
    pub hash: String,
}

/// User data lookup result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserData {
    pub success: bool,
    pub data: Map<String, Value>,
}

impl UserData {
    #[must_use]
    pub fn found(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Username from a successful lookup, if the gateway returned one.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.data.get("username").and_then(Value::as_str)
    }
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Decrypt the `payload` query parameter delivered to `/callback`.
    fn decrypt_payload(&self, payload: &str) -> Result<DecryptedPayload, Error>;

    /// Check a decrypted payload and extract the user it vouches for.
    fn verify_payload(&self, payload: &DecryptedPayload) -> Result<PayloadVerdict, Error>;

    /// Mint a cookie token for `user_id`.
    fn generate_cookie(&self, user_id: &str) -> Result<CookieToken, Error>;

    /// Decrypt a cookie token into its user id and integrity hash.
    fn decrypt_cookie(&self, token: &str) -> Result<CookieClaims, Error>;

    /// Check the integrity hash of a decrypted cookie.
    fn validate_cookie(&self, user_id: &str, hash: &str) -> bool;

    /// Fetch user data from the gateway.
    async fn get_user_data(&self, user_id: &str) -> Result<UserData, Error>;
}

/// Build the gateway authorization URL the login page links to.
///
/// # Errors
/// Returns an error if the gateway base URL cannot be joined with the auth path.
pub fn authorization_url(gateway_url: &Url, project_uuid: &Uuid) -> Result<Url, Error> {
    let base = gateway_url.as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/gate/auth"))?;
    url.query_pairs_mut()
        .append_pair("project_uuid", &project_uuid.to_string());
    Ok(url)
}

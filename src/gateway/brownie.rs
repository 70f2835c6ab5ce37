//! BrownieGate client.
//!
//! Payloads and cookie tokens are sealed as `base64url(nonce (12 bytes) ||
//! ciphertext)` with ChaCha20-Poly1305. The cipher key is the SHA-256 of the
//! project encryption key; the associated data binds each token to its purpose
//! and to the project.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{
    CookieClaims, CookieToken, DecryptedPayload, Error, GatewayClient, PayloadVerdict, UserData,
};

pub const DEFAULT_GATEWAY_URL: &str = "https://www.browniegate.xyz";

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const NONCE_LEN: usize = 12;
// Payloads are one-time proofs handed over by a browser redirect.
const PAYLOAD_MAX_AGE_SECONDS: i64 = 5 * 60;
const PAYLOAD_CLOCK_SKEW_SECONDS: i64 = 60;
const PAYLOAD_AAD: &str = "browniegate.payload";
const COOKIE_AAD: &str = "browniegate.cookie";

#[derive(Clone)]
pub struct BrownieConfig {
    project_uuid: Uuid,
    api_key: SecretString,
    encryption_key: SecretString,
    gateway_url: String,
    timeout: Duration,
}

impl BrownieConfig {
    #[must_use]
    pub fn new(project_uuid: Uuid, api_key: SecretString, encryption_key: SecretString) -> Self {
        Self {
            project_uuid,
            api_key,
            encryption_key,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_gateway_url(mut self, gateway_url: String) -> Self {
        self.gateway_url = gateway_url;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn project_uuid(&self) -> &Uuid {
        &self.project_uuid
    }

    #[must_use]
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }
}

impl std::fmt::Debug for BrownieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrownieConfig")
            .field("project_uuid", &self.project_uuid)
            .field("api_key", &"***")
            .field("encryption_key", &"***")
            .field("gateway_url", &self.gateway_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct PayloadClaims {
    user_id: String,
    project_uuid: String,
    issued_at: i64,
}

#[derive(Serialize, Deserialize)]
struct CookieBody {
    user_id: String,
    hash: String,
}

pub struct BrownieClient {
    project_uuid: Uuid,
    api_key: SecretString,
    cipher_key: [u8; 32],
    gateway_url: Url,
    http: reqwest::Client,
}

impl BrownieClient {
    /// Build a client from its configuration.
    ///
    /// # Errors
    /// Returns an error if the gateway URL is invalid or the HTTP client cannot be built.
    pub fn new(config: BrownieConfig) -> Result<Self> {
        let gateway_url = Url::parse(&config.gateway_url)
            .with_context(|| format!("Invalid gateway URL: {}", config.gateway_url))?;

        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build gateway HTTP client")?;

        let cipher_key: [u8; 32] =
            Sha256::digest(config.encryption_key.expose_secret().as_bytes()).into();

        Ok(Self {
            project_uuid: config.project_uuid,
            api_key: config.api_key,
            cipher_key,
            gateway_url,
            http,
        })
    }

    #[must_use]
    pub fn gateway_url(&self) -> &Url {
        &self.gateway_url
    }

    /// Seal a payload the way the gateway does before redirecting to `/callback`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be serialized or encrypted.
    pub fn seal_payload(&self, user_id: &str, issued_at: i64) -> Result<String, Error> {
        let claims = PayloadClaims {
            user_id: user_id.to_string(),
            project_uuid: self.project_uuid.to_string(),
            issued_at,
        };
        let plaintext = serde_json::to_vec(&claims)?;
        self.seal(&plaintext, &self.aad(PAYLOAD_AAD))
    }

    fn aad(&self, purpose: &str) -> Vec<u8> {
        format!("{purpose}:{}", self.project_uuid).into_bytes()
    }

    #[allow(deprecated)]
    fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<String, Error> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.cipher_key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| Error::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(Base64UrlUnpadded::encode_string(&sealed))
    }

    #[allow(deprecated)]
    fn open(&self, token: &str, aad: &[u8]) -> Result<Vec<u8>, Error> {
        let sealed = Base64UrlUnpadded::decode_vec(token.trim()).map_err(|_| Error::Base64)?;
        if sealed.len() <= NONCE_LEN {
            return Err(Error::Truncated);
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.cipher_key));

        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| Error::Decrypt)
    }

    /// Integrity hash binding a user id to this project and API key.
    fn cookie_hash(&self, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.api_key.expose_secret().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.project_uuid.as_bytes());
        hasher.update([0u8]);
        hasher.update(user_id.as_bytes());
        Base64UrlUnpadded::encode_string(&hasher.finalize())
    }
}

#[async_trait]
impl GatewayClient for BrownieClient {
    fn decrypt_payload(&self, payload: &str) -> Result<DecryptedPayload, Error> {
        let plaintext = self.open(payload, &self.aad(PAYLOAD_AAD))?;
        Ok(DecryptedPayload::new(plaintext))
    }

    fn verify_payload(&self, payload: &DecryptedPayload) -> Result<PayloadVerdict, Error> {
        let claims: PayloadClaims = serde_json::from_slice(payload.as_bytes())?;

        let age = now_unix_seconds().saturating_sub(claims.issued_at);
        let fresh = (-PAYLOAD_CLOCK_SKEW_SECONDS..=PAYLOAD_MAX_AGE_SECONDS).contains(&age);
        let same_project = claims.project_uuid == self.project_uuid.to_string();

        if !fresh {
            debug!(age, "payload outside freshness window");
        }
        if !same_project {
            debug!("payload issued for a different project");
        }

        Ok(PayloadVerdict {
            success: fresh && same_project && !claims.user_id.is_empty(),
            user_id: claims.user_id,
        })
    }

    fn generate_cookie(&self, user_id: &str) -> Result<CookieToken, Error> {
        let body = CookieBody {
            user_id: user_id.to_string(),
            hash: self.cookie_hash(user_id),
        };
        let plaintext = serde_json::to_vec(&body)?;
        let token = self.seal(&plaintext, &self.aad(COOKIE_AAD))?;
        Ok(CookieToken::Bytes(token.into_bytes()))
    }

    fn decrypt_cookie(&self, token: &str) -> Result<CookieClaims, Error> {
        let plaintext = self.open(token, &self.aad(COOKIE_AAD))?;
        let body: CookieBody = serde_json::from_slice(&plaintext)?;
        Ok(CookieClaims {
            user_id: body.user_id,
            hash: body.hash,
        })
    }

    fn validate_cookie(&self, user_id: &str, hash: &str) -> bool {
        self.cookie_hash(user_id)
            .as_bytes()
            .ct_eq(hash.as_bytes())
            .into()
    }

    #[instrument(skip(self))]
    async fn get_user_data(&self, user_id: &str) -> Result<UserData, Error> {
        let base = self.gateway_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/api/user/data"))?;
        url.query_pairs_mut()
            .append_pair("project_uuid", &self.project_uuid.to_string())
            .append_pair("user_id", user_id);

        let response = self
            .http
            .get(url)
            .header("x-api-key", self.api_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "gateway user data lookup rejected");
            return Ok(UserData::not_found());
        }

        let data: Map<String, Value> = response.json().await?;
        Ok(UserData::found(data))
    }
}

/// Unix seconds for payload freshness checks.
pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

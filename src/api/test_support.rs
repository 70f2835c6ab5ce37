//! Gateway stub for handler and middleware tests.
//!
//! Payload grammar: `ok.<user_id>` verifies, `denied.<user_id>` decrypts but
//! fails verification, `broken` decrypts but errors during verification,
//! anything else fails to decrypt. Cookie tokens are `stub.<user_id>.<hash>`.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Map, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use url::Url;

use super::state::{AppState, AuthConfig, AuthMode};
use crate::gateway::{
    CookieClaims, CookieToken, DecryptedPayload, Error, GatewayClient, PayloadVerdict, UserData,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum TokenStyle {
    #[default]
    Bytes,
    Text,
    Garbage,
}

#[derive(Debug, Default)]
pub struct StubGateway {
    usernames: HashMap<String, String>,
    lookup_fails: bool,
    token_style: TokenStyle,
    lookups: AtomicUsize,
}

impl StubGateway {
    pub fn with_user(mut self, user_id: &str, username: &str) -> Self {
        self.usernames
            .insert(user_id.to_string(), username.to_string());
        self
    }

    pub fn with_failing_lookup(mut self) -> Self {
        self.lookup_fails = true;
        self
    }

    pub fn with_text_tokens(mut self) -> Self {
        self.token_style = TokenStyle::Text;
        self
    }

    pub fn with_binary_garbage_tokens(mut self) -> Self {
        self.token_style = TokenStyle::Garbage;
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn token_for(user_id: &str, hash: &str) -> String {
        format!("stub.{user_id}.{hash}")
    }

    fn hash_for(user_id: &str) -> String {
        format!("h-{user_id}")
    }

    pub fn valid_token(user_id: &str) -> String {
        Self::token_for(user_id, &Self::hash_for(user_id))
    }
}

#[async_trait]
impl GatewayClient for StubGateway {
    fn decrypt_payload(&self, payload: &str) -> Result<DecryptedPayload, Error> {
        if payload == "broken" || payload.starts_with("ok.") || payload.starts_with("denied.") {
            Ok(DecryptedPayload::new(payload.as_bytes().to_vec()))
        } else {
            Err(Error::Decrypt)
        }
    }

    fn verify_payload(&self, payload: &DecryptedPayload) -> Result<PayloadVerdict, Error> {
        let text = String::from_utf8_lossy(payload.as_bytes()).into_owned();
        if let Some(user_id) = text.strip_prefix("ok.") {
            return Ok(PayloadVerdict {
                success: true,
                user_id: user_id.to_string(),
            });
        }
        if let Some(user_id) = text.strip_prefix("denied.") {
            return Ok(PayloadVerdict {
                success: false,
                user_id: user_id.to_string(),
            });
        }
        Err(Error::Truncated)
    }

    fn generate_cookie(&self, user_id: &str) -> Result<CookieToken, Error> {
        let token = Self::valid_token(user_id);
        Ok(match self.token_style {
            TokenStyle::Bytes => CookieToken::Bytes(token.into_bytes()),
            TokenStyle::Text => CookieToken::Text(token),
            TokenStyle::Garbage => CookieToken::Bytes(vec![0xff, 0xfe, 0xfd]),
        })
    }

    fn decrypt_cookie(&self, token: &str) -> Result<CookieClaims, Error> {
        let mut parts = token.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("stub"), Some(user_id), Some(hash)) => Ok(CookieClaims {
                user_id: user_id.to_string(),
                hash: hash.to_string(),
            }),
            _ => Err(Error::Decrypt),
        }
    }

    fn validate_cookie(&self, user_id: &str, hash: &str) -> bool {
        hash == Self::hash_for(user_id)
    }

    async fn get_user_data(&self, user_id: &str) -> Result<UserData, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.lookup_fails {
            return Err(Error::Url(url::ParseError::EmptyHost));
        }
        match self.usernames.get(user_id) {
            Some(username) => {
                let mut data = Map::new();
                data.insert("username".to_string(), json!(username));
                data.insert("user_id".to_string(), Value::String(user_id.to_string()));
                Ok(UserData::found(data))
            }
            None => Ok(UserData::not_found()),
        }
    }
}

pub const TEST_SESSION_SECRET: &str = "test-session-secret-0123456789abcdef";

pub fn app_state(mode: AuthMode, gateway: Arc<StubGateway>) -> anyhow::Result<AppState> {
    let authorization_url = Url::parse(
        "https://gateway.test/gate/auth?project_uuid=00000000-0000-0000-0000-000000000000",
    )?;
    let config = AuthConfig::new(authorization_url).with_mode(mode);
    Ok(AppState::new(
        config,
        gateway,
        &SecretString::from(TEST_SESSION_SECRET),
    ))
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid base64url encoding")]
    Base64,
    #[error("sealed token too short")]
    Truncated,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("cookie token is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid gateway url")]
    Url(#[from] url::ParseError),
    #[error("gateway request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

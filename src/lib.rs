//! # BrownieGate login
//!
//! `browniegate-login` signs users in through the BrownieGate authentication
//! gateway and keeps them signed in with one of two strategies:
//!
//! - **session**: the identity only lives in the server-side login session.
//! - **cookie**: an encrypted, long-lived `auth` cookie is issued on login and
//!   restores the login session on later visits.
//!
//! ## Flow
//!
//! The gateway redirects back to `/callback?payload=...` with a one-time
//! encrypted proof of identity. The payload is decrypted and verified through
//! the [`gateway::GatewayClient`], the login session is established and, in
//! cookie mode, the `auth` cookie is issued. Every later request goes through
//! the auth middleware, which resolves the identity from the session or the
//! cookie before the handlers run.
//!
//! ## Sessions
//!
//! Sessions are kept in memory and addressed by a ULID carried in a signed
//! `session` cookie. The signing key is derived from the configured session
//! secret, so session cookies stay valid across restarts with the same secret.

pub mod api;
pub mod cli;
pub mod gateway;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

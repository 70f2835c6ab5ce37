use anyhow::{Context, Result};
use axum_extra::extract::cookie::SameSite;
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::state::AuthMode;

pub const ARG_MODE: &str = "mode";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SAMESITE: &str = "cookie-samesite";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

/// Minimum length of the session signing secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug)]
pub struct Options {
    pub mode: AuthMode,
    pub secret: SecretString,
    pub ttl_seconds: u64,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Options {
    /// Collect the session and cookie arguments.
    ///
    /// # Errors
    /// Returns an error if the session secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --session-secret")?;

        Ok(Self {
            mode: matches
                .get_one::<AuthMode>(ARG_MODE)
                .copied()
                .unwrap_or_default(),
            secret,
            ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
            same_site: matches
                .get_one::<SameSite>(ARG_COOKIE_SAMESITE)
                .copied()
                .unwrap_or(SameSite::Lax),
            secure: matches
                .get_one::<bool>(ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(false),
        })
    }
}

fn parse_same_site(value: &str) -> Result<SameSite, String> {
    match value.to_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        _ => Err(format!(
            "invalid SameSite value: {value} (expected strict, lax or none)"
        )),
    }
}

fn parse_session_secret(value: &str) -> Result<String, String> {
    if value.len() < MIN_SESSION_SECRET_LEN {
        return Err(format!(
            "session secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
        ));
    }
    Ok(value.to_string())
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MODE)
                .short('m')
                .long(ARG_MODE)
                .help("Authentication mode: session or cookie")
                .env("AUTH_MODE")
                .default_value("cookie")
                .value_parser(|value: &str| value.parse::<AuthMode>()),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign the session cookie (at least 32 bytes)")
                .env("SESSION_SECRET")
                .hide_env_values(true)
                .required(true)
                .value_parser(parse_session_secret),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Idle lifetime of a login session, in seconds")
                .env("SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SAMESITE)
                .long(ARG_COOKIE_SAMESITE)
                .help("SameSite attribute of the auth cookie: strict, lax or none")
                .env("COOKIE_SAMESITE")
                .default_value("lax")
                .value_parser(parse_same_site),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark session and auth cookies Secure (HTTPS only)")
                .env("COOKIE_SECURE")
                .action(ArgAction::Set)
                .num_args(0..=1)
                .default_value("false")
                .default_missing_value("true")
                .value_parser(BoolishValueParser::new()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_values() {
        assert_eq!(parse_same_site("Strict"), Ok(SameSite::Strict));
        assert_eq!(parse_same_site("lax"), Ok(SameSite::Lax));
        assert_eq!(parse_same_site("NONE"), Ok(SameSite::None));
        assert!(parse_same_site("sometimes").is_err());
    }

    #[test]
    fn session_secret_length() {
        assert!(parse_session_secret("short").is_err());
        assert!(parse_session_secret(&"x".repeat(MIN_SESSION_SECRET_LEN - 1)).is_err());
        assert!(parse_session_secret(&"x".repeat(MIN_SESSION_SECRET_LEN)).is_ok());
    }
}

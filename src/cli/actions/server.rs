use crate::{
    api::{
        self,
        state::{AppState, AuthConfig, AuthMode},
    },
    gateway::{self, BrownieClient, BrownieConfig},
};
use anyhow::{Context, Result};
use axum_extra::extract::cookie::SameSite;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub mode: AuthMode,
    pub project_uuid: Uuid,
    pub api_key: SecretString,
    pub encryption_key: SecretString,
    pub gateway_url: Url,
    pub gateway_timeout_seconds: u64,
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_same_site: SameSite,
    pub cookie_secure: bool,
}

/// Build the application state described by `args`.
///
/// # Errors
/// Returns an error if the gateway client or authorization URL cannot be built.
pub fn app_state(args: Args) -> Result<(u16, AppState)> {
    if args.cookie_same_site == SameSite::None && !args.cookie_secure {
        warn!("COOKIE_SAMESITE=none without COOKIE_SECURE; browsers will reject the auth cookie");
    }

    let config = BrownieConfig::new(args.project_uuid, args.api_key, args.encryption_key)
        .with_gateway_url(args.gateway_url.to_string())
        .with_timeout(Duration::from_secs(args.gateway_timeout_seconds));
    debug!("gateway config: {:?}", config);

    let client = BrownieClient::new(config)?;
    let authorization_url = gateway::authorization_url(client.gateway_url(), &args.project_uuid)
        .context("Failed to build gateway authorization URL")?;

    let auth_config = AuthConfig::new(authorization_url)
        .with_mode(args.mode)
        .with_same_site(args.cookie_same_site)
        .with_cookie_secure(args.cookie_secure)
        .with_session_ttl_seconds(args.session_ttl_seconds);

    Ok((
        args.port,
        AppState::new(auth_config, Arc::new(client), &args.session_secret),
    ))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mode = args.mode;
    let (port, state) = app_state(args)?;

    info!(
        %mode,
        authorization_url = %state.config().authorization_url(),
        "Starting BrownieGate login"
    );

    api::new(port, state).await
}

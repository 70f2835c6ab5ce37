//! Maps validated CLI matches to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{gateway, session, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(5000);

    let gateway_opts = gateway::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        mode: session_opts.mode,
        project_uuid: gateway_opts.project_uuid,
        api_key: gateway_opts.api_key,
        encryption_key: gateway_opts.encryption_key,
        gateway_url: gateway_opts.url,
        gateway_timeout_seconds: gateway_opts.timeout_seconds,
        session_secret: session_opts.secret,
        session_ttl_seconds: session_opts.ttl_seconds,
        cookie_same_site: session_opts.same_site,
        cookie_secure: session_opts.secure,
    }))
}

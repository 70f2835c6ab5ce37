use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::gateway::DEFAULT_GATEWAY_URL;

pub const ARG_PROJECT_UUID: &str = "project-uuid";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_ENCRYPTION_KEY: &str = "encryption-key";
pub const ARG_GATEWAY_URL: &str = "gateway-url";
pub const ARG_GATEWAY_TIMEOUT_SECONDS: &str = "gateway-timeout-seconds";

#[derive(Debug)]
pub struct Options {
    pub project_uuid: Uuid,
    pub api_key: SecretString,
    pub encryption_key: SecretString,
    pub url: Url,
    pub timeout_seconds: u64,
}

impl Options {
    /// Collect the gateway arguments.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let project_uuid = matches
            .get_one::<Uuid>(ARG_PROJECT_UUID)
            .copied()
            .context("missing required argument: --project-uuid")?;
        let api_key = matches
            .get_one::<String>(ARG_API_KEY)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --api-key")?;
        let encryption_key = matches
            .get_one::<String>(ARG_ENCRYPTION_KEY)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --encryption-key")?;
        let url = matches
            .get_one::<Url>(ARG_GATEWAY_URL)
            .cloned()
            .context("missing required argument: --gateway-url")?;
        let timeout_seconds = matches
            .get_one::<u64>(ARG_GATEWAY_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(10);

        Ok(Self {
            project_uuid,
            api_key,
            encryption_key,
            url,
            timeout_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROJECT_UUID)
                .long(ARG_PROJECT_UUID)
                .help("BrownieGate project UUID")
                .env("PROJECT_UUID")
                .required(true)
                .value_parser(|value: &str| {
                    Uuid::parse_str(value).map_err(|err| format!("invalid project UUID: {err}"))
                }),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("BrownieGate project API key")
                .env("API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ENCRYPTION_KEY)
                .long(ARG_ENCRYPTION_KEY)
                .help("Shared key used to decrypt gateway payloads and cookie tokens")
                .env("ENCRYPTION_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GATEWAY_URL)
                .long(ARG_GATEWAY_URL)
                .help("BrownieGate base URL")
                .env("BROWNIE_GATE_URL")
                .default_value(DEFAULT_GATEWAY_URL)
                .value_parser(|value: &str| {
                    Url::parse(value).map_err(|err| format!("invalid gateway URL: {err}"))
                }),
        )
        .arg(
            Arg::new(ARG_GATEWAY_TIMEOUT_SECONDS)
                .long(ARG_GATEWAY_TIMEOUT_SECONDS)
                .help("Timeout for user data requests to the gateway, in seconds")
                .env("BROWNIE_GATE_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

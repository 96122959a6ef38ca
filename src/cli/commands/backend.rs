use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_API_KEY: &str = "api-key";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: Url,
    pub api_key: SecretString,
}

impl Options {
    /// Parse identity service arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an argument is missing or the URL is invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let url = read_required(ARG_API_URL)?;
        let url = Url::parse(url.trim()).with_context(|| format!("invalid --{ARG_API_URL}"))?;

        Ok(Self {
            url,
            api_key: SecretString::from(read_required(ARG_API_KEY)?),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Identity service base URL, example: https://project.example.co")
                .env("AUTHFLOW_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Public (anon) API key of the identity service")
                .env("AUTHFLOW_API_KEY")
                .hide_env_values(true)
                .global(true),
        )
}

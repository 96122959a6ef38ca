//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action for the chosen subcommand, with the
//! identity service and flow settings already parsed.

use crate::cli::actions::{Action, callback, login};
use crate::cli::commands::{ARG_CALLBACK_URL, CMD_CALLBACK, CMD_LOGIN, backend, flow};
use anyhow::{Context, Result, bail};
use url::Url;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_LOGIN, _)) => Ok(Action::Login(login::Args {
            backend: backend::Options::parse(matches)?,
            flow: flow::Options::parse(matches)?.into_config(),
        })),
        Some((CMD_CALLBACK, sub)) => {
            let url = sub
                .get_one::<String>(ARG_CALLBACK_URL)
                .context("missing required argument: <url>")?;
            let callback_url = Url::parse(url.trim()).context("invalid callback URL")?;

            Ok(Action::Callback(callback::Args {
                backend: backend::Options::parse(matches)?,
                flow: flow::Options::parse(matches)?.into_config(),
                callback_url,
            }))
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("missing command"),
    }
}

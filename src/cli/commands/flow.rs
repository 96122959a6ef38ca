use crate::auth::{FlowConfig, PhoneScheme};
use anyhow::{Context, ensure};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;
use url::Url;

pub const ARG_SITE_ORIGIN: &str = "site-origin";
pub const ARG_CALLBACK_PATH: &str = "callback-path";
pub const ARG_COUNTRY_PREFIX: &str = "country-prefix";
pub const ARG_PHONE_DIGITS: &str = "phone-digits";
pub const ARG_CODE_LENGTH: &str = "code-length";
pub const ARG_REDIRECT_DELAY_MS: &str = "redirect-delay-ms";

#[derive(Debug, Clone)]
pub struct Options {
    pub site_origin: Url,
    pub callback_path: String,
    pub country_prefix: String,
    pub phone_digits: usize,
    pub code_length: usize,
    pub redirect_delay: Duration,
}

impl Options {
    /// Parse flow arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the site origin is invalid or a length is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let site_origin = Url::parse(&read(ARG_SITE_ORIGIN)?)
            .with_context(|| format!("invalid --{ARG_SITE_ORIGIN}"))?;

        let phone_digits = matches
            .get_one::<usize>(ARG_PHONE_DIGITS)
            .copied()
            .unwrap_or(8);
        let code_length = matches
            .get_one::<usize>(ARG_CODE_LENGTH)
            .copied()
            .unwrap_or(6);
        ensure!(phone_digits > 0, "--{ARG_PHONE_DIGITS} must be greater than 0");
        ensure!(code_length > 0, "--{ARG_CODE_LENGTH} must be greater than 0");

        let redirect_delay = Duration::from_millis(
            matches
                .get_one::<u64>(ARG_REDIRECT_DELAY_MS)
                .copied()
                .unwrap_or(2000),
        );

        Ok(Self {
            site_origin,
            callback_path: read(ARG_CALLBACK_PATH)?,
            country_prefix: read(ARG_COUNTRY_PREFIX)?,
            phone_digits,
            code_length,
            redirect_delay,
        })
    }

    #[must_use]
    pub fn into_config(self) -> FlowConfig {
        FlowConfig::new(self.site_origin)
            .with_callback_path(self.callback_path)
            .with_phone_scheme(PhoneScheme {
                country_prefix: self.country_prefix,
                national_digits: self.phone_digits,
            })
            .with_code_length(self.code_length)
            .with_redirect_delay(self.redirect_delay)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SITE_ORIGIN)
                .long(ARG_SITE_ORIGIN)
                .help("Site origin the provider callback is built on")
                .env("AUTHFLOW_SITE_ORIGIN")
                .default_value("http://localhost:3000")
                .global(true),
        )
        .arg(
            Arg::new(ARG_CALLBACK_PATH)
                .long(ARG_CALLBACK_PATH)
                .help("Path of the federated sign-in callback on the site origin")
                .env("AUTHFLOW_CALLBACK_PATH")
                .default_value("/auth/callback")
                .global(true),
        )
        .arg(
            Arg::new(ARG_COUNTRY_PREFIX)
                .long(ARG_COUNTRY_PREFIX)
                .help("Country calling code prepended to phone numbers")
                .env("AUTHFLOW_COUNTRY_PREFIX")
                .default_value("+506")
                .allow_hyphen_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_PHONE_DIGITS)
                .long(ARG_PHONE_DIGITS)
                .help("Number of national phone digits")
                .env("AUTHFLOW_PHONE_DIGITS")
                .default_value("8")
                .value_parser(clap::value_parser!(usize))
                .global(true),
        )
        .arg(
            Arg::new(ARG_CODE_LENGTH)
                .long(ARG_CODE_LENGTH)
                .help("Number of digits in the emailed one-time code")
                .env("AUTHFLOW_CODE_LENGTH")
                .default_value("6")
                .value_parser(clap::value_parser!(usize))
                .global(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_DELAY_MS)
                .long(ARG_REDIRECT_DELAY_MS)
                .help("Delay before leaving the profile confirmation, in milliseconds")
                .env("AUTHFLOW_REDIRECT_DELAY_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
}

use anyhow::{anyhow, Context, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_PIN: &str = "pin";
pub const ARG_TOKEN_EXPIRY_MS: &str = "token-expiry-ms";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";

/// Tokens are stored with whole-second TTLs.
const MIN_TOKEN_EXPIRY_MS: u64 = 1_000;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PIN)
                .long(ARG_PIN)
                .help("Shared PIN exchanged for bearer tokens")
                .env("TALLY_PIN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_EXPIRY_MS)
                .long(ARG_TOKEN_EXPIRY_MS)
                .help("Token lifetime in milliseconds (default: 30 days)")
                .env("TALLY_TOKEN_EXPIRY_MS")
                .default_value("2592000000")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Rate limit on x-forwarded-for / x-real-ip instead of the peer address")
                .env("TALLY_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

#[derive(Debug)]
pub struct Options {
    pub pin: SecretString,
    pub token_expiry: Duration,
    pub trust_proxy_headers: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if the PIN is missing or blank, or the expiry is under one second.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let pin = matches
            .get_one::<String>(ARG_PIN)
            .cloned()
            .context("missing required argument: --pin")?;
        if pin.trim().is_empty() {
            return Err(anyhow!("--pin must not be blank"));
        }

        let expiry_ms = matches
            .get_one::<u64>(ARG_TOKEN_EXPIRY_MS)
            .copied()
            .unwrap_or(2_592_000_000);
        if expiry_ms < MIN_TOKEN_EXPIRY_MS {
            return Err(anyhow!(
                "--{ARG_TOKEN_EXPIRY_MS} must be at least {MIN_TOKEN_EXPIRY_MS}"
            ));
        }

        Ok(Self {
            pin: SecretString::from(pin),
            token_expiry: Duration::from_millis(expiry_ms),
            trust_proxy_headers: matches.get_flag(ARG_TRUST_PROXY_HEADERS),
        })
    }
}

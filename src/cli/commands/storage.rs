use crate::auth::{cleanup::DEFAULT_CLEANUP_INTERVAL, KvConfig};
use anyhow::{anyhow, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

pub const ARG_PRODUCTION: &str = "production";
pub const ARG_TOKENS_FILE: &str = "tokens-file";
pub const ARG_KV_URL: &str = "kv-url";
pub const ARG_KV_TOKEN: &str = "kv-token";
pub const ARG_KV_TIMEOUT_SECONDS: &str = "kv-timeout-seconds";
pub const ARG_CLEANUP_INTERVAL_SECONDS: &str = "cleanup-interval-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PRODUCTION)
                .long(ARG_PRODUCTION)
                .help("Store tokens in the KV service instead of a local file")
                .env("TALLY_PRODUCTION")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_TOKENS_FILE)
                .long(ARG_TOKENS_FILE)
                .help("JSON file holding tokens when not in production")
                .env("TALLY_TOKENS_FILE")
                .default_value("data/tokens.json")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_KV_URL)
                .long(ARG_KV_URL)
                .help("KV REST API URL, example: https://example.upstash.io")
                .env("TALLY_KV_REST_API_URL"),
        )
        .arg(
            Arg::new(ARG_KV_TOKEN)
                .long(ARG_KV_TOKEN)
                .help("KV REST API bearer token")
                .env("TALLY_KV_REST_API_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_KV_TIMEOUT_SECONDS)
                .long(ARG_KV_TIMEOUT_SECONDS)
                .help("Timeout for each KV request in seconds")
                .env("TALLY_KV_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_CLEANUP_INTERVAL_SECONDS)
                .long(ARG_CLEANUP_INTERVAL_SECONDS)
                .help("Seconds between sweeps of expired tokens")
                .env("TALLY_CLEANUP_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

/// Where issued tokens live.
#[derive(Debug)]
pub enum Backend {
    File(PathBuf),
    Kv(KvConfig),
}

#[derive(Debug)]
pub struct Options {
    pub backend: Backend,
    pub cleanup_interval: Duration,
}

impl Options {
    /// # Errors
    /// Returns an error if production is requested without KV URL and token.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let cleanup_interval = matches
            .get_one::<u64>(ARG_CLEANUP_INTERVAL_SECONDS)
            .copied()
            .map_or(DEFAULT_CLEANUP_INTERVAL, Duration::from_secs);

        let backend = if matches.get_flag(ARG_PRODUCTION) {
            let url = non_blank(matches, ARG_KV_URL).ok_or_else(|| {
                anyhow!("missing required argument: --{ARG_KV_URL} (required in production)")
            })?;
            let token = non_blank(matches, ARG_KV_TOKEN).ok_or_else(|| {
                anyhow!("missing required argument: --{ARG_KV_TOKEN} (required in production)")
            })?;
            let timeout = matches
                .get_one::<u64>(ARG_KV_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5);

            Backend::Kv(
                KvConfig::new(url, SecretString::from(token))
                    .with_timeout(Duration::from_secs(timeout)),
            )
        } else {
            let path = matches
                .get_one::<PathBuf>(ARG_TOKENS_FILE)
                .cloned()
                .unwrap_or_else(|| PathBuf::from("data/tokens.json"));
            Backend::File(path)
        };

        Ok(Self {
            backend,
            cleanup_interval,
        })
    }
}

fn non_blank(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

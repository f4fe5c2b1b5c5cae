pub mod auth;
pub mod storage;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_VERBOSITY: &str = "verbosity";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `TALLY_LOG_LEVEL` takes a level name or a count up to 5.
fn parse_log_level(level: &str) -> Result<u8, String> {
    match level.parse::<u8>() {
        Ok(count) if count <= 5 => Ok(count),
        Ok(count) => Err(format!("log level {count} is out of range")),
        Err(_) => LOG_LEVELS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level: {level}")),
    }
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("tally")
        .about("PIN authentication for the shared tally counters")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("TALLY_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Log level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TALLY_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(ValueParser::from(parse_log_level)),
        );

    let command = auth::with_args(command);
    storage::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const ENV_VARS: [&str; 11] = [
        "TALLY_PORT",
        "TALLY_PIN",
        "TALLY_TOKEN_EXPIRY_MS",
        "TALLY_TRUST_PROXY_HEADERS",
        "TALLY_PRODUCTION",
        "TALLY_TOKENS_FILE",
        "TALLY_KV_REST_API_URL",
        "TALLY_KV_REST_API_TOKEN",
        "TALLY_KV_TIMEOUT_SECONDS",
        "TALLY_CLEANUP_INTERVAL_SECONDS",
        "TALLY_LOG_LEVEL",
    ];

    fn clean_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let mut all: Vec<(&str, Option<&str>)> =
            ENV_VARS.iter().map(|name| (*name, None)).collect();
        for (name, value) in vars {
            all.retain(|(existing, _)| existing != name);
            all.push((*name, *value));
        }
        temp_env::with_vars(all, f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "tally");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("PIN authentication for the shared tally counters".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        clean_env(&[], || {
            let matches = new().get_matches_from(vec!["tally", "--pin", "12345"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));
            assert_eq!(
                matches.get_one::<String>(auth::ARG_PIN).cloned(),
                Some("12345".to_string())
            );
            assert_eq!(
                matches.get_one::<u64>(auth::ARG_TOKEN_EXPIRY_MS).copied(),
                Some(2_592_000_000)
            );
            assert!(!matches.get_flag(auth::ARG_TRUST_PROXY_HEADERS));
            assert!(!matches.get_flag(storage::ARG_PRODUCTION));
            assert_eq!(
                matches.get_one::<PathBuf>(storage::ARG_TOKENS_FILE).cloned(),
                Some(PathBuf::from("data/tokens.json"))
            );
            assert_eq!(
                matches
                    .get_one::<u64>(storage::ARG_KV_TIMEOUT_SECONDS)
                    .copied(),
                Some(5)
            );
            assert_eq!(
                matches
                    .get_one::<u64>(storage::ARG_CLEANUP_INTERVAL_SECONDS)
                    .copied(),
                Some(3600)
            );
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(0));
        });
    }

    #[test]
    fn test_pin_is_required() {
        clean_env(&[], || {
            let result = new().try_get_matches_from(vec!["tally"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_check_env() {
        clean_env(
            &[
                ("TALLY_PORT", Some("443")),
                ("TALLY_PIN", Some("24680")),
                ("TALLY_TOKEN_EXPIRY_MS", Some("60000")),
                ("TALLY_TRUST_PROXY_HEADERS", Some("true")),
                ("TALLY_PRODUCTION", Some("1")),
                ("TALLY_KV_REST_API_URL", Some("https://kv.example.com")),
                ("TALLY_KV_REST_API_TOKEN", Some("kv-secret")),
                ("TALLY_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["tally"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(auth::ARG_PIN).cloned(),
                    Some("24680".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>(auth::ARG_TOKEN_EXPIRY_MS).copied(),
                    Some(60_000)
                );
                assert!(matches.get_flag(auth::ARG_TRUST_PROXY_HEADERS));
                assert!(matches.get_flag(storage::ARG_PRODUCTION));
                assert_eq!(
                    matches.get_one::<String>(storage::ARG_KV_URL).cloned(),
                    Some("https://kv.example.com".to_string())
                );
                assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, level) in levels.iter().enumerate() {
            clean_env(&[("TALLY_LOG_LEVEL", Some(*level)), ("TALLY_PIN", Some("1"))], || {
                let matches = new().get_matches_from(vec!["tally"]);
                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_u8 {
            clean_env(&[], || {
                let mut args = vec!["tally".to_string(), "--pin".to_string(), "1".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(usize::from(index))));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                    Some(index)
                );
            });
        }
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("3"), Ok(3));
        assert_eq!(parse_log_level("DEBUG"), Ok(3));
        assert!(parse_log_level("6").is_err());
        assert!(parse_log_level("chatty").is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        clean_env(&[("TALLY_LOG_LEVEL", Some("loud")), ("TALLY_PIN", Some("1"))], || {
            assert!(new().try_get_matches_from(vec!["tally"]).is_err());
        });
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        clean_env(&[], || {
            let result = new().try_get_matches_from(vec![
                "tally",
                "--pin",
                "1",
                "--cleanup-interval-seconds",
                "0",
            ]);
            assert!(result.is_err());
        });
    }
}

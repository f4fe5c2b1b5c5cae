//! Map parsed CLI arguments to an [`Action`].

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, storage, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let storage_opts = storage::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        pin: auth_opts.pin,
        token_expiry: auth_opts.token_expiry,
        trust_proxy_headers: auth_opts.trust_proxy_headers,
        backend: storage_opts.backend,
        cleanup_interval: storage_opts.cleanup_interval,
    }))
}

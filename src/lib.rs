//! # Tally (PIN authentication)
//!
//! `tally` guards a small counter app shared by two people. Instead of user
//! accounts there is one shared PIN; a correct PIN is exchanged for an opaque
//! bearer token that the device keeps until it expires.
//!
//! ## Tokens
//!
//! Tokens are 32 random bytes rendered as 64 lowercase hex characters. They
//! are stored with their creation and expiry instants, either in a Redis
//! compatible REST key-value service (production, native TTL) or in a JSON
//! file swept by a periodic cleanup task (local development).
//!
//! ## Brute-force protection
//!
//! Failed PIN attempts are counted per client IP. Thirty failures inside a
//! fifteen minute window lock the client out for fifteen minutes. PINs are
//! compared in constant time.
//!
//! ## Guarding routes
//!
//! Application routes go behind [`api::protect`], which answers `401` with
//! `NO_TOKEN` or `INVALID_TOKEN` and otherwise hands the validated
//! [`api::AuthenticatedToken`] to the handler.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

//! Auth handlers and the request guard.
//!
//! `validate-pin` exchanges the shared PIN for a bearer token and
//! `validate-token` reports whether a token is still good. Everything else
//! in the app sits behind [`guard::require_token`].

pub mod guard;
pub mod pin;
pub mod token;
pub mod types;
mod utils;

pub use guard::{authorize, protect, require_token, AuthenticatedToken, GuardRejection};
pub use pin::validate_pin;
pub use token::validate_token;

//! Bearer token generation.

use rand::{rngs::OsRng, RngCore};

pub const TOKEN_BYTES: usize = 32;

/// Mint a new opaque token: 32 random bytes as 64 lowercase hex characters.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

//! Constant-time secret comparison.

use std::hint::black_box;

/// Compare a presented PIN against the configured one.
///
/// Length mismatches return early; PIN length is fixed and public, so only
/// the length leaks. Equal-length inputs are always scanned to the end.
#[must_use]
pub fn compare(candidate: &str, secret: &str) -> bool {
    let candidate = candidate.as_bytes();
    let secret = secret.as_bytes();

    if candidate.len() != secret.len() {
        return false;
    }

    let mut diff = 0u8;
    for (a, b) in candidate.iter().zip(secret.iter()) {
        diff |= black_box(a ^ b);
    }

    diff == 0
}

//! Auth error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The KV backend could not be reached or rejected the command.
    #[error("token store unavailable: {0}")]
    Unavailable(String),
    #[error("token store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token record could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("PIN is required")]
    MissingPin,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Too many failed attempts. Try again in {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },
    #[error("failed to generate token: {0}")]
    TokenGeneration(#[from] rand::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Stable machine-readable code for API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPin => "PIN_REQUIRED",
            Self::InvalidPin => "INVALID_PIN",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::TokenGeneration(_) => "INTERNAL_ERROR",
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

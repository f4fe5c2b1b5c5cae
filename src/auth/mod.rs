//! PIN authentication core.
//!
//! `AuthManager` owns the per-client rate limiter and the token store. It is
//! constructed explicitly and shared behind an `Arc`; nothing here is global.
//!
//! ## Issue flow
//!
//! 1. Refuse locked-out clients without touching the attempt counter.
//! 2. Compare the PIN in constant time.
//! 3. On mismatch, count a failure for the client.
//! 4. On match, mint and persist a fresh token, then clear the client's record.
//!
//! Tokens are never renewed; each device keeps its own until it expires.

pub mod cleanup;
pub mod clock;
pub mod compare;
pub mod error;
pub mod rate_limit;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, StorageError};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use store::{FileTokenStore, KvConfig, KvTokenStore, MemoryTokenStore, TokenRecord, TokenStore};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 30 days.
pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pin: SecretString,
    token_expiry: Duration,
    trust_proxy_headers: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(pin: SecretString) -> Self {
        Self {
            pin,
            token_expiry: DEFAULT_TOKEN_EXPIRY,
            trust_proxy_headers: false,
        }
    }

    #[must_use]
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Key rate limiting on `x-forwarded-for` / `x-real-ip` instead of the
    /// socket peer. Only safe behind a proxy that overwrites those headers.
    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn token_expiry(&self) -> Duration {
        self.token_expiry
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    fn token_expiry_ms(&self) -> i64 {
        i64::try_from(self.token_expiry.as_millis()).unwrap_or(i64::MAX)
    }
}

/// A freshly minted bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

pub struct AuthManager {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    store: Arc<dyn TokenStore>,
}

impl AuthManager {
    #[must_use]
    pub fn new(config: AuthConfig, store: Arc<dyn TokenStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: AuthConfig, store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiter: RateLimiter::new(clock.clone()),
            config,
            clock,
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Exchange a PIN for a new bearer token.
    ///
    /// # Errors
    /// `RateLimited` while the client is locked out, `InvalidPin` on mismatch,
    /// `Storage` if the token cannot be persisted.
    pub async fn issue(&self, pin: &str, client_id: &str) -> Result<IssuedToken, AuthError> {
        if let RateLimitDecision::Limited {
            retry_after_seconds,
        } = self.limiter.check(client_id)
        {
            warn!(client_id, retry_after_seconds, "PIN attempt from locked-out client");
            return Err(AuthError::RateLimited {
                retry_after_seconds,
            });
        }

        if !compare::compare(pin, self.config.pin.expose_secret()) {
            self.limiter.record_failure(client_id);
            warn!(client_id, "invalid PIN attempt");
            return Err(AuthError::InvalidPin);
        }

        let token = token::generate_token()?;
        let now = self.clock.now_ms();
        let record = TokenRecord {
            expires_at: now.saturating_add(self.config.token_expiry_ms()),
            created_at: now,
        };
        self.store
            .put(&token, record, store::remaining_ttl(record.expires_at, now))
            .await?;
        self.limiter.reset(client_id);

        info!(
            client_id,
            backend = self.store.name(),
            expires_at = record.expires_at,
            "issued auth token"
        );

        Ok(IssuedToken {
            token,
            expires_at: record.expires_at,
        })
    }

    /// Check a bearer token, surfacing storage failures.
    ///
    /// Expired records found here are deleted.
    ///
    /// # Errors
    /// Returns an error if the token store cannot be read.
    pub async fn check_token(&self, token: &str) -> Result<bool, StorageError> {
        if token.is_empty() {
            return Ok(false);
        }

        let Some(record) = self.store.get(token).await? else {
            return Ok(false);
        };

        if record.is_expired(self.clock.now_ms()) {
            self.store.delete(token).await?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Check a bearer token. Storage failures count as invalid (fail closed).
    pub async fn validate(&self, token: &str) -> bool {
        match self.check_token(token).await {
            Ok(valid) => valid,
            Err(err) => {
                error!("token validation failed closed: {err}");
                false
            }
        }
    }

    /// Sweep expired tokens and stale rate-limit records.
    ///
    /// A no-op for stores with native expiry.
    ///
    /// # Errors
    /// Returns an error if the token store cannot be read or rewritten.
    pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        let pruned_clients = self.limiter.prune_stale();
        let removed = self.store.prune_expired(self.clock.now_ms()).await?;
        if removed > 0 || pruned_clients > 0 {
            info!(
                removed,
                pruned_clients,
                backend = self.store.name(),
                "cleaned up expired auth state"
            );
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

//! Token persistence backends.
//!
//! The backend is picked once at start-up: the KV store in production, the
//! JSON file otherwise. Both speak the same three-operation contract; only the
//! file store needs an explicit sweep because KV entries expire natively.

mod file;
mod kv;
mod memory;

pub use file::FileTokenStore;
pub use kv::{KvConfig, KvTokenStore};
pub use memory::MemoryTokenStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::StorageError;

/// Persisted state for one issued token. Timestamps are epoch milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub expires_at: i64,
    pub created_at: i64,
}

impl TokenRecord {
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Persist `record` under `token`. `ttl` is the remaining lifetime, used
    /// by backends with native expiry.
    async fn put(&self, token: &str, record: TokenRecord, ttl: Duration)
        -> Result<(), StorageError>;

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, StorageError>;

    async fn delete(&self, token: &str) -> Result<(), StorageError>;

    /// Remove every record with `expires_at <= now_ms`. Backends with native
    /// expiry keep the default no-op.
    async fn prune_expired(&self, _now_ms: i64) -> Result<usize, StorageError> {
        Ok(0)
    }
}

/// Remaining lifetime in whole seconds, rounded to nearest and clamped at zero.
#[must_use]
pub fn remaining_ttl(expires_at: i64, now_ms: i64) -> Duration {
    let remaining_ms = (expires_at - now_ms).max(0);
    let seconds = (remaining_ms + 500) / 1000;
    Duration::from_secs(u64::try_from(seconds).unwrap_or(0))
}

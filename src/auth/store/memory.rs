use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{StorageError, TokenRecord, TokenStore};

/// Process-local token store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(
        &self,
        token: &str,
        record: TokenRecord,
        _ttl: Duration,
    ) -> Result<(), StorageError> {
        self.records.write().await.insert(token.to_string(), record);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        Ok(self.records.read().await.get(token).copied())
    }

    async fn delete(&self, token: &str) -> Result<(), StorageError> {
        self.records.write().await.remove(token);
        Ok(())
    }

    async fn prune_expired(&self, now_ms: i64) -> Result<usize, StorageError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now_ms));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() -> Result<(), StorageError> {
        let store = MemoryTokenStore::new();
        let record = TokenRecord {
            expires_at: 2_000,
            created_at: 1_000,
        };
        store.put("abc", record, Duration::from_secs(1)).await?;
        assert_eq!(store.get("abc").await?, Some(record));
        store.delete("abc").await?;
        assert_eq!(store.get("abc").await?, None);
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn prune_removes_only_expired() -> Result<(), StorageError> {
        let store = MemoryTokenStore::new();
        let zero = Duration::ZERO;
        store
            .put("old", TokenRecord { expires_at: 1_000, created_at: 0 }, zero)
            .await?;
        store
            .put("new", TokenRecord { expires_at: 9_000, created_at: 0 }, zero)
            .await?;
        assert_eq!(store.prune_expired(1_000).await?, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("new").await?.is_some());
        Ok(())
    }
}

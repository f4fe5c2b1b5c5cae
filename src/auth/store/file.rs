//! JSON-document token store for local and non-production runs.
//!
//! The whole document is read, mutated and rewritten on each write. Rewrites
//! go through a sibling temp file and `rename`, so readers never observe a
//! half-written document. An in-process mutex serialises read-modify-write
//! cycles; across processes the last writer wins.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use super::{StorageError, TokenRecord, TokenStore};

type Document = BTreeMap<String, TokenRecord>;

#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Document, StorageError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(err) => return Err(err.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Document::new());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, document: &Document) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(document)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn put(
        &self,
        token: &str,
        record: TokenRecord,
        _ttl: Duration,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.insert(token.to_string(), record);
        self.save(&document).await
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(token).copied())
    }

    async fn delete(&self, token: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        if document.remove(token).is_some() {
            self.save(&document).await?;
        }
        Ok(())
    }

    async fn prune_expired(&self, now_ms: i64) -> Result<usize, StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let before = document.len();
        document.retain(|_, record| !record.is_expired(now_ms));
        let removed = before - document.len();
        if removed > 0 {
            self.save(&document).await?;
        }
        debug!(removed, remaining = document.len(), "pruned token file");
        Ok(removed)
    }
}

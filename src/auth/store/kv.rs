//! Durable KV token store over a Redis-compatible REST API.
//!
//! Commands are sent as JSON arrays (`["SET", key, value, "EX", ttl]`) with a
//! bearer token, the wire format used by Upstash / Vercel KV. Every entry gets
//! a native expiry, so this backend never needs a sweep.
//!
//! Failures are never papered over: transport errors, timeouts, non-success
//! statuses and error bodies all surface as `StorageError::Unavailable`.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info_span, Instrument};

use super::{StorageError, TokenRecord, TokenStore};

pub const DEFAULT_KEY_PREFIX: &str = "auth:token:";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct KvConfig {
    url: String,
    token: SecretString,
    timeout: Duration,
    key_prefix: String,
}

impl KvConfig {
    #[must_use]
    pub fn new(url: String, token: SecretString) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            token,
            timeout: DEFAULT_TIMEOUT,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: String) -> Self {
        self.key_prefix = prefix;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug)]
pub struct KvTokenStore {
    client: Client,
    config: KvConfig,
}

impl KvTokenStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: KvConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(unavailable)?;
        Ok(Self { client, config })
    }

    fn key(&self, token: &str) -> String {
        format!("{}{token}", self.config.key_prefix)
    }

    async fn command(&self, args: Value) -> Result<Value, StorageError> {
        let operation = args
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let span = info_span!(
            "kv.command",
            db.system = "redis",
            db.operation = %operation
        );

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(self.config.token.expose_secret())
            .json(&args)
            .send()
            .instrument(span)
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Unavailable(format!(
                "kv {operation} failed: {status} {body}"
            )));
        }

        let body: Value = response.json().await.map_err(unavailable)?;
        if let Some(err) = body.get("error").and_then(Value::as_str) {
            return Err(StorageError::Unavailable(format!(
                "kv {operation} failed: {err}"
            )));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl TokenStore for KvTokenStore {
    fn name(&self) -> &'static str {
        "kv"
    }

    async fn put(
        &self,
        token: &str,
        record: TokenRecord,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        // Redis rejects EX 0; the record's own expiresAt still rules on read.
        let ttl_seconds = ttl.as_secs().max(1);

        let value = serde_json::to_string(&record)?;
        self.command(json!(["SET", self.key(token), value, "EX", ttl_seconds]))
            .await?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        match self.command(json!(["GET", self.key(token)])).await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            // Some clients store JSON values natively.
            other => Ok(Some(serde_json::from_value(other)?)),
        }
    }

    async fn delete(&self, token: &str) -> Result<(), StorageError> {
        self.command(json!(["DEL", self.key(token)])).await?;
        Ok(())
    }
}

fn unavailable(err: reqwest::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::{
        extract::State,
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    const KV_TOKEN: &str = "kv-secret";

    #[derive(Default)]
    struct FakeKv {
        values: Mutex<HashMap<String, (String, Option<u64>)>>,
        fail_with: Mutex<Option<String>>,
    }

    async fn handle(
        State(kv): State<Arc<FakeKv>>,
        headers: HeaderMap,
        Json(args): Json<Vec<Value>>,
    ) -> impl IntoResponse {
        let authorized = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some(format!("Bearer {KV_TOKEN}").as_str());
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})));
        }
        if let Some(err) = kv.fail_with.lock().ok().and_then(|fail| (*fail).clone()) {
            return (StatusCode::OK, Json(json!({ "error": err })));
        }

        let text = |i: usize| {
            args.get(i)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let Ok(mut values) = kv.values.lock() else {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "poisoned"})));
        };
        let result = match text(0).as_str() {
            "SET" => {
                let ttl = args.get(4).and_then(Value::as_u64);
                values.insert(text(1), (text(2), ttl));
                json!("OK")
            }
            "GET" => values
                .get(&text(1))
                .map_or(Value::Null, |(value, _)| json!(value)),
            "DEL" => json!(i64::from(values.remove(&text(1)).is_some())),
            _ => return (StatusCode::BAD_REQUEST, Json(json!({"error": "ERR unknown command"}))),
        };
        (StatusCode::OK, Json(json!({ "result": result })))
    }

    async fn spawn_fake() -> Result<(Arc<FakeKv>, String)> {
        let kv = Arc::new(FakeKv::default());
        let app = Router::new().route("/", post(handle)).with_state(kv.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok((kv, format!("http://{addr}")))
    }

    fn store(url: String, token: &str) -> Result<KvTokenStore> {
        let config = KvConfig::new(url, SecretString::from(token.to_string()))
            .with_timeout(Duration::from_secs(2));
        Ok(KvTokenStore::new(config)?)
    }

    fn record() -> TokenRecord {
        TokenRecord {
            expires_at: 1_700_000_060_000,
            created_at: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn put_sets_namespaced_key_with_native_expiry() -> Result<()> {
        let (kv, url) = spawn_fake().await?;
        let store = store(url, KV_TOKEN)?;
        store.put("abc", record(), Duration::from_secs(60)).await?;

        let values = kv.values.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        let (raw, ttl) = values
            .get("auth:token:abc")
            .context("key not written")?
            .clone();
        assert_eq!(ttl, Some(60));
        let stored: TokenRecord = serde_json::from_str(&raw)?;
        assert_eq!(stored, record());
        Ok(())
    }

    #[tokio::test]
    async fn get_and_delete_round_trip() -> Result<()> {
        let (_kv, url) = spawn_fake().await?;
        let store = store(url, KV_TOKEN)?;
        assert_eq!(store.get("abc").await?, None);
        store.put("abc", record(), Duration::from_secs(60)).await?;
        assert_eq!(store.get("abc").await?, Some(record()));
        store.delete("abc").await?;
        assert_eq!(store.get("abc").await?, None);
        assert_eq!(store.prune_expired(i64::MAX).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn sub_second_ttl_is_written_with_one_second_expiry() -> Result<()> {
        let (kv, url) = spawn_fake().await?;
        let store = store(url, KV_TOKEN)?;
        store.put("abc", record(), Duration::from_millis(400)).await?;
        store.put("def", record(), Duration::ZERO).await?;

        let values = kv.values.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        assert_eq!(values.get("auth:token:abc").map(|(_, ttl)| *ttl), Some(Some(1)));
        assert_eq!(values.get("auth:token:def").map(|(_, ttl)| *ttl), Some(Some(1)));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_unavailable() -> Result<()> {
        let (_kv, url) = spawn_fake().await?;
        let store = store(url, "wrong")?;
        let result = store.get("abc").await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        Ok(())
    }

    #[tokio::test]
    async fn error_body_surfaces_as_unavailable() -> Result<()> {
        let (kv, url) = spawn_fake().await?;
        if let Ok(mut fail) = kv.fail_with.lock() {
            *fail = Some("ERR max daily request limit exceeded".to_string());
        }
        let store = store(url, KV_TOKEN)?;
        let result = store.put("abc", record(), Duration::from_secs(60)).await;
        match result {
            Err(StorageError::Unavailable(message)) => {
                assert!(message.contains("max daily request limit"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_as_unavailable() -> Result<()> {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let store = store(format!("http://{addr}"), KV_TOKEN)?;
        let result = store.get("abc").await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        Ok(())
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = KvConfig::new(
            "https://kv.example.com/".to_string(),
            SecretString::from("t".to_string()),
        );
        assert_eq!(config.url(), "https://kv.example.com");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }
}

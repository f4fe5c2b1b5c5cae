use crate::{
    api,
    auth::{AuthConfig, AuthManager, FileTokenStore, KvTokenStore, TokenStore},
    cli::commands::storage::Backend,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub pin: SecretString,
    pub token_expiry: Duration,
    pub trust_proxy_headers: bool,
    pub backend: Backend,
    pub cleanup_interval: Duration,
}

/// Build the token store selected by `backend`.
///
/// # Errors
/// Returns an error if the KV HTTP client cannot be built.
pub fn token_store(backend: Backend) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match backend {
        Backend::File(path) => {
            info!("Storing tokens in {}", path.display());
            Arc::new(FileTokenStore::new(path))
        }
        Backend::Kv(config) => {
            info!("Storing tokens in KV service at {}", config.url());
            Arc::new(KvTokenStore::new(config).context("Failed to build KV client")?)
        }
    };
    Ok(store)
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token store cannot be set up or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = token_store(args.backend)?;

    let config = AuthConfig::new(args.pin)
        .with_token_expiry(args.token_expiry)
        .with_trust_proxy_headers(args.trust_proxy_headers);
    let manager = Arc::new(AuthManager::new(config, store));

    api::new(args.port, manager, args.cleanup_interval).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KvConfig;

    #[test]
    fn file_backend_builds_file_store() -> Result<()> {
        let store = token_store(Backend::File("data/tokens.json".into()))?;
        assert_eq!(store.name(), "file");
        Ok(())
    }

    #[test]
    fn kv_backend_builds_kv_store() -> Result<()> {
        let config = KvConfig::new(
            "https://kv.example.com".to_string(),
            SecretString::from("secret".to_string()),
        );
        let store = token_store(Backend::Kv(config))?;
        assert_eq!(store.name(), "kv");
        Ok(())
    }
}

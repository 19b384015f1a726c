//! Building a ready-to-use token service from [`Settings`]

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::info;

use tg_core::cache::{ExpiringStore, MemoryStore, StoreSweeper, SweeperConfig};
use tg_core::TokenService;
use tg_shared::{CacheStrategyConfig, CacheType, Settings};

use crate::InfrastructureError;

/// The store selected by configuration
pub struct SelectedStore {
    /// Backend for invalidation markers and the revocation list
    pub store: Arc<dyn ExpiringStore>,
    /// Set when the backend is in-process and needs sweeping
    pub memory: Option<Arc<MemoryStore>>,
}

/// A token service together with the resources that keep it running
pub struct TokenRuntime {
    pub service: TokenService,
    pub store: Arc<dyn ExpiringStore>,
    /// Background sweeper for the in-process store, if one was started
    pub sweeper: Option<JoinHandle<()>>,
}

impl Drop for TokenRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

/// Create the store named by `config.cache_type`
pub async fn build_store(config: &CacheStrategyConfig) -> Result<SelectedStore, InfrastructureError> {
    match config.cache_type {
        CacheType::Memory => {
            let memory = Arc::new(MemoryStore::<Value>::new());
            Ok(SelectedStore {
                store: memory.clone(),
                memory: Some(memory),
            })
        }
        #[cfg(feature = "redis-cache")]
        CacheType::Redis => {
            let store = crate::cache::RedisStore::connect(config.redis.clone()).await?;
            Ok(SelectedStore {
                store: Arc::new(store),
                memory: None,
            })
        }
        #[cfg(not(feature = "redis-cache"))]
        CacheType::Redis => Err(InfrastructureError::Config(
            "cache_type is redis but the redis-cache feature is disabled".to_string(),
        )),
    }
}

/// Build the token service described by `settings`
///
/// Configuration errors surface here, before any token is issued. With the
/// in-process store a background sweeper is started; it stops when the
/// returned runtime is dropped.
pub async fn build_token_service(settings: &Settings) -> Result<TokenRuntime, InfrastructureError> {
    let selected = build_store(&settings.cache).await?;
    let service = TokenService::from_config(&settings.jwt, Some(selected.store.clone()))?;

    let sweeper = selected.memory.and_then(|memory| {
        let sweeper = StoreSweeper::new(SweeperConfig::from(&settings.cache.memory)).with_target(memory);
        Arc::new(sweeper).start_background_task()
    });

    info!(
        cache_type = ?settings.cache.cache_type,
        sweeping = sweeper.is_some(),
        "token runtime ready"
    );

    Ok(TokenRuntime {
        service,
        store: selected.store,
        sweeper,
    })
}

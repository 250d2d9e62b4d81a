pub mod memory;
pub mod redis_backed;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cache seam shared by the message-generator fingerprint cache (C5) and the
/// query-service result cache (C9). Mirrors `src/cache/redis_cache.py` +
/// `src/cache/memory_cache.py`: every method degrades to a safe default
/// instead of returning `Result`, so a cache outage never fails a request.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool;
    async fn delete(&self, key: &str) -> bool;
    async fn exists(&self, key: &str) -> bool;
    /// Implementation name, surfaced on `/cache/stats`.
    fn backend(&self) -> &'static str;
}

pub type CacheHandle = Arc<dyn Cache>;

/// Connects to Redis if `CACHE_ENABLED` and reachable, otherwise falls back
/// to the in-process memory cache. Matches `RedisCache.__init__`'s behaviour
/// of logging and continuing rather than raising when the ping fails.
pub async fn connect(cfg: &CacheConfig) -> CacheHandle {
    if !cfg.enabled {
        tracing::info!("cache disabled via CACHE_ENABLED, using no-op memory cache");
        let cache = Arc::new(memory::MemoryCache::new());
        cache.spawn_reaper();
        return cache;
    }

    match redis_backed::RedisCache::connect(cfg).await {
        Ok(cache) => {
            tracing::info!(host = %cfg.redis_host, "connected to redis cache");
            Arc::new(cache)
        }
        Err(err) => {
            tracing::warn!(error = %err, "redis unavailable, falling back to in-process cache");
            let cache = Arc::new(memory::MemoryCache::new());
            cache.spawn_reaper();
            cache
        }
    }
}

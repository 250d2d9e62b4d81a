use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::Cache;
use crate::config::CacheConfig;

/// Redis-backed cache (`src/cache/redis_cache.py`). Every method swallows
/// connection errors and reports a miss/no-op rather than propagating, so a
/// flaky Redis never takes down the pipeline or the query API.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(cfg: &CacheConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(cfg.redis_url())?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, key, "redis get failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: std::time::Duration) -> bool {
        let mut conn = self.conn.clone();
        match conn
            .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, key, "redis set failed");
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.del::<_, i64>(key).await {
            Ok(n) => n > 0,
            Err(err) => {
                tracing::warn!(error = %err, key, "redis delete failed");
                false
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.exists::<_, bool>(key).await {
            Ok(exists) => exists,
            Err(err) => {
                tracing::warn!(error = %err, key, "redis exists failed");
                false
            }
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::Cache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process fallback cache (`src/cache/memory_cache.py`). A background
/// task reaps expired entries every 60s instead of the original's
/// `threading.Thread` + `RLock`.
pub struct MemoryCache {
    store: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let cache = Self {
            store: Mutex::new(HashMap::new()),
        };
        cache
    }

    /// Spawns the 60s reaper loop. Call once after wrapping in an `Arc`.
    pub fn spawn_reaper(self: &std::sync::Arc<Self>) {
        let weak = std::sync::Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let Some(cache) = weak.upgrade() else {
                    return;
                };
                cache.reap_expired();
            }
        });
    }

    fn reap_expired(&self) {
        let now = Instant::now();
        let mut store = self.store.lock().unwrap();
        let before = store.len();
        store.retain(|_, entry| entry.expires_at > now);
        let reaped = before - store.len();
        if reaped > 0 {
            tracing::debug!(reaped, "memory cache reaper removed expired keys");
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.lock().unwrap();
        let entry = store.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let mut store = self.store.lock().unwrap();
        store.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        true
    }

    async fn delete(&self, key: &str) -> bool {
        let mut store = self.store.lock().unwrap();
        store.remove(key).is_some()
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        assert!(cache.set("k", "v", Duration::from_secs(60)).await);
        assert_eq!(cache.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await;
        assert!(cache.delete("k").await);
        assert!(!cache.exists("k").await);
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::cache::CacheHandle;
use crate::config::CacheConfig;
use crate::fingerprint::{adaptive_ttl, fingerprint};
use crate::llm::{GenerationRequest, MessageGenerator, fallback_message};
use crate::models::UserProfile;

#[derive(Debug, Clone)]
pub struct PoiDescriptor {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    pub hit_rate: f64,
    pub backend: &'static str,
}

/// Orchestrates fingerprint → cache probe → LLM generation → cache store
/// (spec.md §4.3). Grounded on `MessageGeneratorService.generate_message`
/// in `generator_service.py` plus the stats bookkeeping in `cache_utils.py`.
pub struct GeneratorService {
    cache: CacheHandle,
    cache_cfg: CacheConfig,
    llm: Arc<dyn MessageGenerator>,
    hits: AtomicU64,
    misses: AtomicU64,
    total: AtomicU64,
}

impl GeneratorService {
    pub fn new(cache: CacheHandle, cache_cfg: CacheConfig, llm: Arc<dyn MessageGenerator>) -> Self {
        Self {
            cache,
            cache_cfg,
            llm,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Returns `(message, cached)`. A fallback message (LLM failure) is
    /// never stored in the cache — spec.md §4.3(e) / testable property 8.
    pub async fn generate(&self, profile: &UserProfile, poi: &PoiDescriptor) -> (String, bool) {
        if !self.cache_cfg.enabled {
            let (message, _fallback) = self.invoke_llm(profile, poi).await;
            return (message, false);
        }

        self.total.fetch_add(1, Ordering::Relaxed);
        let key = fingerprint(profile, &poi.name, &poi.category);

        if let Some(cached) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return (cached, true);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let (message, used_fallback) = self.invoke_llm(profile, poi).await;
        if !used_fallback {
            let ttl = adaptive_ttl(self.cache_cfg.ttl, &poi.category);
            self.cache.set(&key, &message, ttl).await;
        }

        (message, false)
    }

    /// Returns `(message, used_fallback)`.
    async fn invoke_llm(&self, profile: &UserProfile, poi: &PoiDescriptor) -> (String, bool) {
        let req = GenerationRequest {
            age: profile.age,
            profession: profile.profession.clone(),
            interests: profile.interests.clone(),
            poi_name: poi.name.clone(),
            poi_category: poi.category.clone(),
            poi_description: poi.description.clone(),
        };
        match self.llm.generate(&req).await {
            Ok(message) => (message, false),
            Err(err) => {
                tracing::error!(error = %err, poi = %poi.name, "llm generation failed, using fallback");
                (fallback_message(&poi.name, &poi.category), true)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.total.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            enabled: self.cache_cfg.enabled,
            hits,
            misses,
            total,
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
            backend: self.cache.backend(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubLlm(&'static str);

    #[async_trait]
    impl MessageGenerator for StubLlm {
        async fn generate(&self, _req: &GenerationRequest) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl MessageGenerator for FailingLlm {
        async fn generate(&self, _req: &GenerationRequest) -> anyhow::Result<String> {
            anyhow::bail!("provider unreachable")
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            user_id: 1,
            age: 30,
            profession: "engineer".into(),
            interests: "coffee".into(),
        }
    }

    fn poi() -> PoiDescriptor {
        PoiDescriptor {
            name: "Bar Roma".into(),
            category: "bar".into(),
            description: "Negozio a 50m di distanza".into(),
        }
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache: CacheHandle = Arc::new(crate::cache::memory::MemoryCache::new());
        let cfg = CacheConfig {
            enabled: true,
            ttl: Duration::from_secs(60),
            redis_host: String::new(),
            redis_port: 0,
            redis_db: 0,
            redis_password: None,
        };
        let service = GeneratorService::new(cache, cfg, Arc::new(StubLlm("hello")));

        let (msg1, cached1) = service.generate(&profile(), &poi()).await;
        let (msg2, cached2) = service.generate(&profile(), &poi()).await;

        assert_eq!(msg1, "hello");
        assert!(!cached1);
        assert_eq!(msg2, "hello");
        assert!(cached2);

        let stats = service.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn fallback_on_llm_failure_is_never_cached() {
        let cache: CacheHandle = Arc::new(crate::cache::memory::MemoryCache::new());
        let cfg = CacheConfig {
            enabled: true,
            ttl: Duration::from_secs(60),
            redis_host: String::new(),
            redis_port: 0,
            redis_db: 0,
            redis_password: None,
        };
        let service = GeneratorService::new(cache.clone(), cfg, Arc::new(FailingLlm));

        let (msg, cached) = service.generate(&profile(), &poi()).await;
        assert!(msg.contains("Bar Roma"));
        assert!(!cached);

        let key = fingerprint(&profile(), &poi().name, &poi().category);
        assert_eq!(cache.get(&key).await, None, "fallback message must not be cached");

        let stats = service.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }
}

//! HTTP-surface integration tests for the message-generator service (C5),
//! exercised through the real axum `Router` with `tower::ServiceExt::oneshot`
//! instead of a bound TCP listener. The LLM is a stub (no network calls);
//! the cache is the in-process `MemoryCache`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tower::ServiceExt;

use nearyou::cache::memory::MemoryCache;
use nearyou::config::CacheConfig;
use nearyou::generator::GeneratorService;
use nearyou::llm::{GenerationRequest, MessageGenerator};
use nearyou::{GeneratorState, handlers};

struct StubLlm;

#[async_trait]
impl MessageGenerator for StubLlm {
    async fn generate(&self, req: &GenerationRequest) -> anyhow::Result<String> {
        Ok(format!("Ciao da {}!", req.poi_name))
    }
}

fn test_app() -> Router {
    let cache_cfg = CacheConfig {
        enabled: true,
        ttl: std::time::Duration::from_secs(60),
        redis_host: String::new(),
        redis_port: 0,
        redis_db: 0,
        redis_password: None,
    };
    let cache: nearyou::cache::CacheHandle = Arc::new(MemoryCache::new());
    let generator = Arc::new(GeneratorService::new(cache, cache_cfg, Arc::new(StubLlm)));
    let state = GeneratorState { generator, provider: "stub".to_string() };

    Router::new()
        .route("/generate", post(handlers::generate::generate))
        .route("/health", get(handlers::generate::health))
        .route("/cache/stats", get(handlers::generate::cache_stats))
        .with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn generate_request() -> Request<Body> {
    let payload = json!({
        "user": {"age": 30, "profession": "Ingegnere", "interests": "tecnologia, cucina"},
        "poi": {"name": "Caffè X", "category": "bar", "description": "Negozio a 12m di distanza"}
    });
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn generate_returns_a_message_and_reports_uncached_on_first_call() {
    let app = test_app();
    let response = app.oneshot(generate_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cached"], false);
    assert!(body["message"].as_str().unwrap().contains("Caffè X"));
}

#[tokio::test]
async fn second_identical_call_is_served_from_cache() {
    let app = test_app();

    let first = app.clone().oneshot(generate_request()).await.unwrap();
    assert_eq!(body_json(first).await["cached"], false);

    let second = app.clone().oneshot(generate_request()).await.unwrap();
    assert_eq!(body_json(second).await["cached"], true);

    let stats = app
        .oneshot(Request::builder().uri("/cache/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let stats = body_json(stats).await;
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["total"], 2);
}

#[tokio::test]
async fn health_reports_configured_provider() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "stub");
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use nearyou::config::{CacheConfig, LlmConfig};
use nearyou::generator::GeneratorService;
use nearyou::llm::OpenAiGenerator;
use nearyou::{GeneratorState, cache, handlers, init_tracing, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("nearyou_message_generator=info,tower_http=info");

    let prometheus = observability::install_recorder()?;

    let cache_cfg = CacheConfig::from_env();
    let cache = cache::connect(&cache_cfg).await;

    let llm_cfg = LlmConfig::from_env();
    let provider = llm_cfg.provider.clone();
    let llm = Arc::new(OpenAiGenerator::new(&llm_cfg));

    let generator = Arc::new(GeneratorService::new(cache, cache_cfg, llm));
    let state = GeneratorState { generator, provider: provider.clone() };

    let app = Router::new()
        .route("/generate", post(handlers::generate::generate))
        .route("/health", get(handlers::generate::health))
        .route("/cache/stats", get(handlers::generate::cache_stats))
        .route("/metrics", get(move || { let prometheus = prometheus.clone(); async move { prometheus.render() } }))
        .layer(middleware::from_fn(|req, next| observability::track_requests("nearyou-message-generator", req, next)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8001));
    tracing::info!(provider = %provider, "nearyou-message-generator listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

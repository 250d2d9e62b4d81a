use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use nearyou::config::{CacheConfig, ClickHouseConfig};
use nearyou::{AppState, cache, handlers, init_tracing, migrations, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("nearyou_query_api=info,tower_http=info");

    let prometheus = observability::install_recorder()?;

    let ch_cfg = ClickHouseConfig::from_env();
    let ch = ch_cfg.client();
    migrations::run(&ch).await?;

    let cache_cfg = CacheConfig::from_env();
    let cache = cache::connect(&cache_cfg).await;

    let state = AppState { ch, cache };

    let app = Router::new()
        .route("/timeseries", post(handlers::timeseries::timeseries))
        .route("/aggregate", post(handlers::aggregate::aggregate))
        .route("/user/activity", post(handlers::user_activity::user_activity))
        .route("/shop/performance", post(handlers::shop_performance::shop_performance))
        .route("/data/sources", get(handlers::sources::data_sources))
        .route("/health", get(handlers::health::healthz))
        .route("/metrics", get(move || { let prometheus = prometheus.clone(); async move { prometheus.render() } }))
        .layer(middleware::from_fn(|req, next| observability::track_requests("nearyou-query-api", req, next)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    tracing::info!("nearyou-query-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

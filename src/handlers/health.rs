use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::AppState;

/// Liveness + dependency check (C9). Mirrors the teacher's trivial
/// `healthz`, extended with a cheap ClickHouse ping since this service's
/// whole job is answering ClickHouse-backed queries.
pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let clickhouse_ok = state.ch.query("SELECT 1").execute().await.is_ok();

    Json(json!({
        "status": if clickhouse_ok { "ok" } else { "degraded" },
        "clickhouse": clickhouse_ok,
    }))
}

use axum::Json;
use serde_json::{Value, json};

/// `GET /data/sources` — static description of where each metric lives.
/// Grounded on `get_data_sources` in `app.py`; the payload is descriptive
/// metadata, not a live query, so it is hand-written rather than derived
/// from the schema at request time.
pub async fn data_sources() -> Json<Value> {
    Json(json!({
        "stream": {
            "table": "user_events",
            "retention_days": 7,
            "latency_ms": 100,
        },
        "batch": {
            "tables": ["monthly_shop_summary", "shop_performance_metrics", "user_journey_summary"],
            "update_frequency": "daily",
            "historical_months": 12,
        },
        "materialized_views": ["shop_visits_hourly", "user_activity_daily", "location_heatmap_hourly"],
    }))
}

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::Deserialize;

use crate::AppState;
use crate::models::query::{AggregateQuery, AggregateResponse, AggregateRow};
use crate::query_builder;

#[derive(Debug, Deserialize, Row)]
struct AggregateDbRow {
    dimension: String,
    value: f64,
    count: u64,
}

/// `POST /aggregate` (C9). Named batch-only metrics (`monthly_summary`,
/// `shop_performance`, `user_journeys`) always read a projection table;
/// everything else reads the last 24h of `user_events`. Dimension
/// breakdown only understands `"shop"` — the source's aggregate tables are
/// all shop-centric — other requested dimensions are accepted but return
/// an ungrouped total. Grounded on `QueryEngine.query_batch_aggregate` /
/// `query_stream_aggregate` in `query_engine.py`.
pub async fn aggregate(
    State(state): State<AppState>,
    Json(query): Json<AggregateQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let cache_key = query_builder::cache_key("aggregate", &query);
    if let Some(cached) = state.cache.get(&cache_key).await {
        if let Ok(response) = serde_json::from_str::<AggregateResponse>(&cached) {
            return Ok(Json(response));
        }
    }

    let (start, end) = match &query.time_range {
        Some(range) => (range.start_time, range.end_time),
        None => {
            let end = Utc::now();
            (end - chrono::Duration::hours(24), end)
        }
    };

    let by_shop = query.dimensions.iter().any(|d| d == "shop");

    let rows = if query_builder::aggregate_uses_batch(&query.metric) {
        fetch_batch(&state, &query, start, end, by_shop).await
    } else {
        fetch_stream(&state, &query, start, end, by_shop).await
    }
    .map_err(|e| {
        tracing::error!(error = %e, metric = %query.metric, "aggregate query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("aggregate query failed: {e}"))
    })?;

    let data: Vec<AggregateRow> = rows
        .into_iter()
        .map(|r| {
            let mut dimensions = HashMap::new();
            if by_shop {
                dimensions.insert("shop".to_string(), r.dimension);
            }
            AggregateRow { dimensions, value: r.value, count: r.count }
        })
        .collect();

    let response = AggregateResponse { data, dimensions: query.dimensions.clone() };
    if let Ok(encoded) = serde_json::to_string(&response) {
        state.cache.set(&cache_key, &encoded, query_builder::RESULT_CACHE_TTL).await;
    }

    Ok(Json(response))
}

async fn fetch_stream(
    state: &AppState,
    query: &AggregateQuery,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    by_shop: bool,
) -> anyhow::Result<Vec<AggregateDbRow>> {
    let metric_expr = query_builder::stream_metric_sql(&query.metric);
    let where_clause = query_builder::stream_where_clause(start, end, None, None);

    let sql = if by_shop {
        format!(
            "SELECT poi_name AS dimension, {metric_expr} AS value, count() AS count \
             FROM user_events WHERE {where_clause} GROUP BY dimension ORDER BY value DESC"
        )
    } else {
        format!(
            "SELECT '' AS dimension, {metric_expr} AS value, count() AS count \
             FROM user_events WHERE {where_clause}"
        )
    };

    Ok(state.ch.query(&sql).fetch_all::<AggregateDbRow>().await?)
}

async fn fetch_batch(
    state: &AppState,
    query: &AggregateQuery,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    by_shop: bool,
) -> anyhow::Result<Vec<AggregateDbRow>> {
    let table = query_builder::aggregate_batch_table(&query.metric);
    let (agg_fn, column) = query_builder::aggregate_batch_column(table, &query.metric);
    let time_col = match table {
        "shop_performance_metrics" => "period_start",
        "user_journey_summary" => "journey_date",
        _ => "month",
    };

    const FMT: &str = "%Y-%m-%d %H:%M:%S";
    let where_clause = format!(
        "{time_col} >= '{}' AND {time_col} <= '{}'",
        start.format(FMT),
        end.format(FMT)
    );

    let value_expr = if agg_fn == "count" { "count()".to_string() } else { format!("{agg_fn}({column})") };
    let dimension_col = if table == "user_journey_summary" { "toString(user_id)" } else { "shop_id" };

    let sql = if by_shop && table != "user_journey_summary" {
        format!(
            "SELECT {dimension_col} AS dimension, {value_expr} AS value, count() AS count \
             FROM {table} WHERE {where_clause} GROUP BY dimension ORDER BY value DESC"
        )
    } else {
        format!(
            "SELECT '' AS dimension, {value_expr} AS value, count() AS count \
             FROM {table} WHERE {where_clause}"
        )
    };

    Ok(state.ch.query(&sql).fetch_all::<AggregateDbRow>().await?)
}

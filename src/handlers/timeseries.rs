use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::models::query::{TimeSeriesBucket, TimeSeriesQuery, TimeSeriesResponse, TimeSeriesRow};
use crate::query_builder::{self, Source};

#[derive(Serialize, Deserialize)]
struct CachedTimeSeries {
    data: Vec<TimeSeriesBucket>,
    source: String,
}

/// `POST /timeseries` (C9). Cache-then-route-then-cache: a hit on the
/// result cache skips routing and ClickHouse entirely; a miss routes to
/// the stream or batch source per `query_builder::route_timeseries` and
/// caches the rendered buckets for 5 minutes. Grounded on
/// `app.py::query_timeseries` + `QueryEngine.query_stream_timeseries` /
/// `query_batch_timeseries`.
pub async fn timeseries(
    State(state): State<AppState>,
    Json(query): Json<TimeSeriesQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let cache_key = query_builder::cache_key("timeseries", &query);

    if let Some(cached) = state.cache.get(&cache_key).await {
        if let Ok(parsed) = serde_json::from_str::<CachedTimeSeries>(&cached) {
            return Ok(Json(TimeSeriesResponse {
                data: parsed.data,
                source: if parsed.source == "stream" { "stream" } else { "batch" },
                cached: true,
            }));
        }
    }

    let now = chrono::Utc::now();
    let source = query_builder::route_timeseries(query.start_time, query.end_time, &query.granularity, now);

    let rows = match source {
        Source::Stream => fetch_stream(&state, &query).await,
        Source::Batch => fetch_batch(&state, &query).await,
    }
    .map_err(|e| {
        tracing::error!(error = %e, metric = %query.metric, "timeseries query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("timeseries query failed: {e}"))
    })?;

    let data: Vec<TimeSeriesBucket> = rows
        .into_iter()
        .map(|r| TimeSeriesBucket { timestamp: r.timestamp, value: r.value })
        .collect();

    let payload = CachedTimeSeries { data: data.clone(), source: source.as_str().to_string() };
    if let Ok(encoded) = serde_json::to_string(&payload) {
        state.cache.set(&cache_key, &encoded, query_builder::RESULT_CACHE_TTL).await;
    }

    Ok(Json(TimeSeriesResponse { data, source: source.as_str(), cached: false }))
}

async fn fetch_stream(state: &AppState, query: &TimeSeriesQuery) -> anyhow::Result<Vec<TimeSeriesRow>> {
    let bucket_expr = query_builder::stream_time_bucket(&query.granularity);
    let metric_expr = query_builder::stream_metric_sql(&query.metric);
    let where_clause = query_builder::stream_where_clause(
        query.start_time,
        query.end_time,
        query.filters.shop_id.as_deref(),
        query.filters.user_id,
    );

    let sql = format!(
        "SELECT toString({bucket_expr}) AS timestamp, {metric_expr} AS value \
         FROM user_events WHERE {where_clause} GROUP BY timestamp ORDER BY timestamp"
    );

    Ok(state.ch.query(&sql).fetch_all::<TimeSeriesRow>().await?)
}

async fn fetch_batch(state: &AppState, query: &TimeSeriesQuery) -> anyhow::Result<Vec<TimeSeriesRow>> {
    let table = query_builder::batch_table_for_granularity(&query.granularity);
    let column = query_builder::batch_metric_column(table, &query.metric);
    let time_col = match table {
        "shop_visits_hourly" => "hour",
        "user_activity_daily" => "day",
        _ => "month",
    };

    const FMT: &str = "%Y-%m-%d %H:%M:%S";
    let mut conditions = vec![
        format!("{time_col} >= '{}'", query.start_time.format(FMT)),
        format!("{time_col} <= '{}'", query.end_time.format(FMT)),
    ];
    if table != "user_activity_daily" {
        if let Some(shop) = &query.filters.shop_id {
            conditions.push(format!("shop_id = '{}'", shop.replace('\'', "''")));
        }
    } else if let Some(uid) = query.filters.user_id {
        conditions.push(format!("user_id = {uid}"));
    }
    let where_clause = conditions.join(" AND ");

    let sql = format!(
        "SELECT toString({time_col}) AS timestamp, sum({column}) AS value \
         FROM {table} WHERE {where_clause} GROUP BY timestamp ORDER BY timestamp"
    );

    Ok(state.ch.query(&sql).fetch_all::<TimeSeriesRow>().await?)
}

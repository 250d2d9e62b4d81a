use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{NaiveDate, Utc};
use clickhouse::Row;
use serde::Deserialize;

use crate::AppState;
use crate::models::query::{
    FavoriteShop, HistoricalSummary, LastPosition, RealtimeActivity, UserActivityQuery,
    UserActivityResponse,
};
use crate::query_builder;

#[derive(Debug, Deserialize, Row)]
struct LastPositionRow {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize, Row)]
struct ShopNameRow {
    poi_name: String,
}

#[derive(Debug, Deserialize, Row)]
struct CountRow {
    count: u64,
}

#[derive(Debug, Deserialize, Row)]
struct HistoricalTotalsRow {
    total_days_active: u64,
    total_shops_visited: u64,
    total_distance: f64,
}

#[derive(Debug, Deserialize, Row)]
struct FavoriteShopRow {
    shop: String,
    visits: u64,
}

/// `POST /user/activity` (C9) — blends a live read off `user_events` (last
/// 24h) with a historical read off `user_journey_summary` (default 90-day
/// window). Grounded on `get_user_realtime_activity` +
/// `get_user_historical_activity` in `query_engine.py`.
pub async fn user_activity(
    State(state): State<AppState>,
    Json(query): Json<UserActivityQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let cache_key = query_builder::cache_key("user_activity", &query);
    if let Some(cached) = state.cache.get(&cache_key).await {
        if let Ok(response) = serde_json::from_str::<UserActivityResponse>(&cached) {
            return Ok(Json(response));
        }
    }

    let realtime = fetch_realtime(&state, query.user_id).await.map_err(|e| {
        tracing::error!(error = %e, user_id = query.user_id, "realtime activity query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("realtime activity query failed: {e}"))
    })?;

    let end_date = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start_date = query.start_date.unwrap_or(end_date - chrono::Duration::days(90));

    let historical = fetch_historical(&state, query.user_id, start_date, end_date)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = query.user_id, "historical activity query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("historical activity query failed: {e}"))
        })?;

    let response = UserActivityResponse { user_id: query.user_id, realtime_activity: realtime, historical_summary: historical };

    if let Ok(encoded) = serde_json::to_string(&response) {
        state.cache.set(&cache_key, &encoded, query_builder::RESULT_CACHE_TTL).await;
    }

    Ok(Json(response))
}

async fn fetch_realtime(state: &AppState, user_id: u64) -> anyhow::Result<RealtimeActivity> {
    let last_position = state
        .ch
        .query("SELECT latitude, longitude FROM user_events WHERE user_id = ? ORDER BY event_time DESC LIMIT 1")
        .bind(user_id)
        .fetch_optional::<LastPositionRow>()
        .await?
        .map(|r| LastPosition { lat: r.latitude, lon: r.longitude });

    let recent_shops = state
        .ch
        .query(
            "SELECT DISTINCT poi_name FROM user_events \
             WHERE user_id = ? AND poi_name != '' \
             ORDER BY event_time DESC LIMIT 5",
        )
        .bind(user_id)
        .fetch_all::<ShopNameRow>()
        .await?
        .into_iter()
        .map(|r| r.poi_name)
        .collect();

    let active_minutes = state
        .ch
        .query(
            "SELECT uniqExact(toStartOfMinute(event_time)) AS count FROM user_events \
             WHERE user_id = ? AND event_time >= now() - INTERVAL 1 DAY",
        )
        .bind(user_id)
        .fetch_one::<CountRow>()
        .await?
        .count as u32;

    let messages_received = state
        .ch
        .query(
            "SELECT countIf(poi_info != '') AS count FROM user_events \
             WHERE user_id = ? AND event_time >= now() - INTERVAL 1 DAY",
        )
        .bind(user_id)
        .fetch_one::<CountRow>()
        .await?
        .count;

    Ok(RealtimeActivity { last_position, recent_shops, active_minutes, messages_received })
}

async fn fetch_historical(
    state: &AppState,
    user_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<HistoricalSummary> {
    let totals = state
        .ch
        .query(
            "SELECT \
               uniqExact(journey_date) AS total_days_active, \
               uniqExact(arrayJoin(shops_visited)) AS total_shops_visited, \
               sum(total_distance) AS total_distance \
             FROM user_journey_summary \
             WHERE user_id = ? AND journey_date >= ? AND journey_date <= ?",
        )
        .bind(user_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one::<HistoricalTotalsRow>()
        .await
        .unwrap_or(HistoricalTotalsRow { total_days_active: 0, total_shops_visited: 0, total_distance: 0.0 });

    let favorite_shops = state
        .ch
        .query(
            "SELECT shop, count() AS visits FROM \
               (SELECT arrayJoin(shops_visited) AS shop FROM user_journey_summary \
                WHERE user_id = ? AND journey_date >= ? AND journey_date <= ?) \
             GROUP BY shop ORDER BY visits DESC LIMIT 5",
        )
        .bind(user_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all::<FavoriteShopRow>()
        .await?
        .into_iter()
        .map(|r| FavoriteShop { name: r.shop, visits: r.visits })
        .collect();

    Ok(HistoricalSummary {
        total_days_active: totals.total_days_active,
        total_shops_visited: totals.total_shops_visited,
        total_distance_km: totals.total_distance / 1000.0,
        favorite_shops,
    })
}

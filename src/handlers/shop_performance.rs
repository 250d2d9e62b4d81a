use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use clickhouse::Row;
use serde::Deserialize;

use crate::AppState;
use crate::models::query::{ShopMetrics, ShopPerformanceQuery, ShopPerformanceResponse, ShopTrend};
use crate::query_builder;

#[derive(Debug, Deserialize, Row)]
struct ShopMetricsDbRow {
    shop_id: String,
    total_visits: u64,
    unique_visitors: u64,
    avg_distance_m: f64,
    conversion_rate: f64,
    peak_hour: u8,
}

#[derive(Debug, Deserialize, Row)]
struct PeriodTotalRow {
    shop_id: String,
    total_visits: u64,
}

/// `POST /shop/performance` (C9). Blends `monthly_shop_summary` (visit
/// counts, unique visitors, average distance) with `shop_performance_metrics`
/// (conversion rate, peak hour), and derives a two-window trend. Grounded on
/// `get_shop_performance_metrics` + `get_shop_trends` in `query_engine.py`.
pub async fn shop_performance(
    State(state): State<AppState>,
    Json(query): Json<ShopPerformanceQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if query.shop_ids.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "shop_ids must not be empty".to_string()));
    }

    let cache_key = query_builder::cache_key("shop_performance", &query);
    if let Some(cached) = state.cache.get(&cache_key).await {
        if let Ok(response) = serde_json::from_str::<ShopPerformanceResponse>(&cached) {
            return Ok(Json(response));
        }
    }

    let shops = fetch_metrics(&state, &query).await.map_err(|e| {
        tracing::error!(error = %e, "shop performance query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("shop performance query failed: {e}"))
    })?;

    let trends = fetch_trends(&state, &query).await.map_err(|e| {
        tracing::error!(error = %e, "shop trend query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("shop trend query failed: {e}"))
    })?;

    let response = ShopPerformanceResponse { shops, trends, period_days: query.period_days };

    if let Ok(encoded) = serde_json::to_string(&response) {
        state.cache.set(&cache_key, &encoded, query_builder::RESULT_CACHE_TTL).await;
    }

    Ok(Json(response))
}

fn shop_id_list(shop_ids: &[String]) -> String {
    shop_ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn fetch_metrics(state: &AppState, query: &ShopPerformanceQuery) -> anyhow::Result<Vec<ShopMetrics>> {
    let since = Utc::now() - chrono::Duration::days(query.period_days as i64);
    let ids = shop_id_list(&query.shop_ids);

    let sql = format!(
        "SELECT \
           m.shop_id AS shop_id, \
           sum(m.total_visits) AS total_visits, \
           sum(m.unique_visitors) AS unique_visitors, \
           avg(m.avg_distance) AS avg_distance_m, \
           avg(p.conversion_rate) AS conversion_rate, \
           any(p.peak_hour) AS peak_hour \
         FROM monthly_shop_summary m \
         LEFT JOIN shop_performance_metrics p ON p.shop_id = m.shop_id \
         WHERE m.shop_id IN ({ids}) AND m.month >= '{}' \
         GROUP BY m.shop_id",
        since.format("%Y-%m-%d")
    );

    let rows = state.ch.query(&sql).fetch_all::<ShopMetricsDbRow>().await?;
    Ok(rows
        .into_iter()
        .map(|r| ShopMetrics {
            shop_id: r.shop_id,
            total_visits: r.total_visits,
            unique_visitors: r.unique_visitors,
            conversion_rate: r.conversion_rate,
            peak_hour: r.peak_hour,
            avg_distance_m: r.avg_distance_m,
        })
        .collect())
}

/// Splits `period_days` into two equal windows and compares their total
/// visit counts to classify a trend direction, with a naive linear forecast.
async fn fetch_trends(state: &AppState, query: &ShopPerformanceQuery) -> anyhow::Result<Vec<ShopTrend>> {
    let now = Utc::now();
    let half = (query.period_days as i64 / 2).max(1);
    let mid = now - chrono::Duration::days(half);
    let start = now - chrono::Duration::days(query.period_days as i64);
    let ids = shop_id_list(&query.shop_ids);

    let window_totals = |from: chrono::DateTime<Utc>, to: chrono::DateTime<Utc>| {
        let ids = ids.clone();
        async move {
            let sql = format!(
                "SELECT shop_id, sum(total_visits) AS total_visits FROM monthly_shop_summary \
                 WHERE shop_id IN ({ids}) AND month >= '{}' AND month < '{}' \
                 GROUP BY shop_id",
                from.format("%Y-%m-%d"),
                to.format("%Y-%m-%d"),
            );
            state.ch.query(&sql).fetch_all::<PeriodTotalRow>().await
        }
    };

    let earlier = window_totals(start, mid).await?;
    let later = window_totals(mid, now).await?;

    let earlier_map: std::collections::HashMap<String, u64> =
        earlier.into_iter().map(|r| (r.shop_id, r.total_visits)).collect();
    let later_map: std::collections::HashMap<String, u64> =
        later.into_iter().map(|r| (r.shop_id, r.total_visits)).collect();

    Ok(query
        .shop_ids
        .iter()
        .map(|shop_id| {
            let before = *earlier_map.get(shop_id).unwrap_or(&0);
            let after = *later_map.get(shop_id).unwrap_or(&0);
            classify_trend(shop_id.clone(), before, after)
        })
        .collect())
}

/// Compares two equal-length visit-count windows and derives a direction,
/// percent change, and a naive linear forecast for the next period.
fn classify_trend(shop_id: String, before: u64, after: u64) -> ShopTrend {
    let percent_change = if before == 0 {
        if after == 0 { 0.0 } else { 100.0 }
    } else {
        ((after as f64 - before as f64) / before as f64) * 100.0
    };

    let trend_direction = if percent_change > 5.0 {
        "up"
    } else if percent_change < -5.0 {
        "down"
    } else {
        "stable"
    }
    .to_string();

    let forecast_next_period = if before > 0 || after > 0 {
        Some((after as f64 * (1.0 + percent_change / 100.0)).round() as i64)
    } else {
        None
    };

    ShopTrend { shop_id, trend_direction, percent_change, forecast_next_period }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_visits_classify_as_up() {
        let trend = classify_trend("shop-1".to_string(), 100, 120);
        assert_eq!(trend.trend_direction, "up");
        assert!((trend.percent_change - 20.0).abs() < 1e-9);
    }

    #[test]
    fn falling_visits_classify_as_down() {
        let trend = classify_trend("shop-1".to_string(), 100, 80);
        assert_eq!(trend.trend_direction, "down");
        assert!((trend.percent_change + 20.0).abs() < 1e-9);
    }

    #[test]
    fn small_change_classifies_as_stable() {
        let trend = classify_trend("shop-1".to_string(), 100, 102);
        assert_eq!(trend.trend_direction, "stable");
    }

    #[test]
    fn zero_to_zero_has_no_forecast() {
        let trend = classify_trend("shop-1".to_string(), 0, 0);
        assert_eq!(trend.percent_change, 0.0);
        assert_eq!(trend.forecast_next_period, None);
    }

    #[test]
    fn zero_before_nonzero_after_is_100_percent_up() {
        let trend = classify_trend("shop-1".to_string(), 0, 50);
        assert_eq!(trend.trend_direction, "up");
        assert_eq!(trend.percent_change, 100.0);
        assert_eq!(trend.forecast_next_period, Some(100));
    }
}

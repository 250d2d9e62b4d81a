use chrono::{DateTime, NaiveDate, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};

/// `POST /timeseries` request (spec.md §4.7). Also `Serialize` so it can
/// feed `query_builder::cache_key` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesQuery {
    pub metric: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub granularity: String,
    #[serde(default)]
    pub filters: TimeSeriesFilters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeriesFilters {
    pub shop_id: Option<String>,
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesBucket {
    pub timestamp: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesResponse {
    pub data: Vec<TimeSeriesBucket>,
    pub source: &'static str,
    pub cached: bool,
}

/// ClickHouse row for a timeseries bucket (stream or batch source).
#[derive(Debug, Clone, Deserialize, Row)]
pub struct TimeSeriesRow {
    pub timestamp: String,
    pub value: f64,
}

/// `POST /aggregate` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub metric: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRow {
    pub dimensions: std::collections::HashMap<String, String>,
    pub value: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub data: Vec<AggregateRow>,
    pub dimensions: Vec<String>,
}

/// `POST /user/activity` request/response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivityQuery {
    pub user_id: u64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeActivity {
    pub last_position: Option<LastPosition>,
    pub recent_shops: Vec<String>,
    pub active_minutes: u32,
    pub messages_received: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastPosition {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSummary {
    pub total_days_active: u64,
    pub total_shops_visited: u64,
    pub total_distance_km: f64,
    pub favorite_shops: Vec<FavoriteShop>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteShop {
    pub name: String,
    pub visits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivityResponse {
    pub user_id: u64,
    pub realtime_activity: RealtimeActivity,
    pub historical_summary: HistoricalSummary,
}

/// `POST /shop/performance` request/response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopPerformanceQuery {
    pub shop_ids: Vec<String>,
    #[serde(default = "default_period_days")]
    pub period_days: u32,
}

fn default_period_days() -> u32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopPerformanceResponse {
    pub shops: Vec<ShopMetrics>,
    pub trends: Vec<ShopTrend>,
    pub period_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopMetrics {
    pub shop_id: String,
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub conversion_rate: f64,
    pub peak_hour: u8,
    pub avg_distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopTrend {
    pub shop_id: String,
    pub trend_direction: String,
    pub percent_change: f64,
    pub forecast_next_period: Option<i64>,
}

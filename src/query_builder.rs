use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result-cache TTL for every C9 endpoint (spec.md §4.7 step 4).
pub const RESULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Routing target chosen for a query (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Stream,
    Batch,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Stream => "stream",
            Source::Batch => "batch",
        }
    }
}

/// Stream-vs-batch routing law for `/timeseries` (spec.md §4.7, testable
/// property 6, scenario S5). Grounded on `QueryEngine.should_use_stream` in
/// `query_engine.py`. `now` is taken as a parameter rather than read
/// internally (`Utc::now()`) so the boundary can be exercised deterministically.
pub fn route_timeseries(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    granularity: &str,
    now: DateTime<Utc>,
) -> Source {
    let days_since_start = (now - start_time).num_days();
    let range_hours = (end_time - start_time).num_seconds() as f64 / 3600.0;

    if days_since_start <= 7 && matches!(granularity, "minute" | "hour") {
        return Source::Stream;
    }
    if range_hours <= 24.0 {
        return Source::Stream;
    }
    Source::Batch
}

/// `/aggregate` routing: these metrics always read batch projections
/// regardless of time range (spec.md §4.7); everything else uses a 24h
/// stream window.
pub fn aggregate_uses_batch(metric: &str) -> bool {
    matches!(metric, "monthly_summary" | "shop_performance" | "user_journeys")
}

/// Batch projection table selection for `/timeseries`, keyed by granularity
/// (spec.md §4.7, §9 Open Questions for the hourly/daily DDL).
pub fn batch_table_for_granularity(granularity: &str) -> &'static str {
    match granularity {
        "hour" => "shop_visits_hourly",
        "day" => "user_activity_daily",
        _ => "monthly_shop_summary",
    }
}

/// ClickHouse time-bucket expression for the stream (`user_events`) source.
/// Grounded on `query_engine.py`'s `time_bucket` map.
pub fn stream_time_bucket(granularity: &str) -> &'static str {
    match granularity {
        "minute" => "toStartOfMinute(event_time)",
        "hour" => "toStartOfHour(event_time)",
        "day" => "toDate(event_time)",
        "month" => "toStartOfMonth(event_time)",
        _ => "toStartOfHour(event_time)",
    }
}

/// ClickHouse metric expression for the stream source. Grounded on
/// `query_engine.py`'s `metric_sql` map.
pub fn stream_metric_sql(metric: &str) -> &'static str {
    match metric {
        "visits" => "count()",
        "unique_users" => "uniq(user_id)",
        "avg_distance" => "avg(poi_range)",
        "messages" => "countIf(poi_info != '')",
        _ => "count()",
    }
}

/// Per-(table, metric) column selection for the batch source, matching
/// `query_engine.py::query_batch_timeseries`'s per-table `metric_col` maps.
pub fn batch_metric_column(table: &str, metric: &str) -> &'static str {
    match (table, metric) {
        ("shop_visits_hourly", "unique_users") => "unique_visitors",
        ("shop_visits_hourly", "avg_distance") => "avg_distance",
        ("shop_visits_hourly", _) => "visits",
        ("user_activity_daily", "unique_shops") => "unique_shops",
        ("user_activity_daily", "total_distance") => "total_distance",
        ("user_activity_daily", _) => "total_events",
        ("monthly_shop_summary", "unique_users") => "unique_visitors",
        ("monthly_shop_summary", "avg_distance") => "avg_distance",
        (_, _) => "total_visits",
    }
}

/// Batch projection table backing a named `/aggregate` metric (spec.md
/// §4.7, grounded on `query_engine.py::query_batch_aggregate`'s per-metric
/// table dispatch).
pub fn aggregate_batch_table(metric: &str) -> &'static str {
    match metric {
        "shop_performance" => "shop_performance_metrics",
        "user_journeys" => "user_journey_summary",
        _ => "monthly_shop_summary",
    }
}

/// Column to `SUM`/`AVG` for a given aggregate table + metric pair.
pub fn aggregate_batch_column(table: &str, metric: &str) -> (&'static str, &'static str) {
    match (table, metric) {
        ("monthly_shop_summary", "unique_users") => ("sum", "unique_visitors"),
        ("monthly_shop_summary", "avg_distance") => ("avg", "avg_distance"),
        ("monthly_shop_summary", _) => ("sum", "total_visits"),
        ("shop_performance_metrics", "conversion_rate") => ("avg", "conversion_rate"),
        ("shop_performance_metrics", "avg_dwell_time") => ("avg", "avg_dwell_time"),
        ("shop_performance_metrics", _) => ("sum", "total_impressions"),
        ("user_journey_summary", "total_distance") => ("sum", "total_distance"),
        ("user_journey_summary", "journey_duration") => ("avg", "journey_duration"),
        (_, _) => ("count", "*"),
    }
}

/// `WHERE` clause for a stream-source `user_events` query over
/// `[start_time, end_time]`, with optional shop/user filters (spec.md §4.7,
/// grounded on `query_engine.py::query_stream_timeseries`'s `where_clauses`).
pub fn stream_where_clause(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    shop_id: Option<&str>,
    user_id: Option<u64>,
) -> String {
    const FMT: &str = "%Y-%m-%d %H:%M:%S";
    let mut conditions = vec![
        format!("event_time >= '{}'", start_time.format(FMT)),
        format!("event_time <= '{}'", end_time.format(FMT)),
    ];

    if let Some(shop) = shop_id {
        conditions.push(format!("poi_name = '{}'", escape(shop)));
    }
    if let Some(uid) = user_id {
        conditions.push(format!("user_id = {uid}"));
    }

    conditions.join(" AND ")
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Cache key for C9's result cache: `query:<type>:md5(sorted-JSON(params))`
/// (spec.md §4.7 step 1). Grounded on `cache_manager.py::get_cache_key`'s
/// `json.dumps(params, sort_keys=True)` + MD5. `serde_json`'s default `Map`
/// is already key-sorted, but `canonicalize` makes that explicit rather than
/// relying on a library default that a future feature flag could change.
pub fn cache_key(query_type: &str, params: &impl Serialize) -> String {
    let value = serde_json::to_value(params).unwrap_or(serde_json::Value::Null);
    let canonical = canonicalize(&value);
    let digest = md5::compute(canonical.as_bytes());
    format!("query:{query_type}:{digest:x}")
}

fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn recent_fine_grained_range_routes_to_stream() {
        let now = dt(2026, 7, 27, 12);
        let start = now - chrono::Duration::days(6);
        let source = route_timeseries(start, now, "hour", now);
        assert_eq!(source, Source::Stream);
    }

    #[test]
    fn old_coarse_range_routes_to_batch() {
        let now = dt(2026, 7, 27, 12);
        let start = now - chrono::Duration::days(90);
        let source = route_timeseries(start, now, "day", now);
        assert_eq!(source, Source::Batch);
    }

    #[test]
    fn short_range_routes_to_stream_regardless_of_recency() {
        let now = dt(2026, 7, 27, 12);
        let start = now - chrono::Duration::days(90) - chrono::Duration::hours(12);
        let end = start + chrono::Duration::hours(20);
        assert_eq!(route_timeseries(start, end, "month", now), Source::Stream);
    }

    #[test]
    fn aggregate_metric_routing() {
        assert!(aggregate_uses_batch("shop_performance"));
        assert!(!aggregate_uses_batch("visits"));
    }

    #[test]
    fn cache_key_ignores_field_order() {
        #[derive(Serialize)]
        struct A {
            b: i32,
            a: i32,
        }
        #[derive(Serialize)]
        struct B {
            a: i32,
            b: i32,
        }
        let k1 = cache_key("timeseries", &A { b: 2, a: 1 });
        let k2 = cache_key("timeseries", &B { a: 1, b: 2 });
        assert_eq!(k1, k2);
    }

    #[test]
    fn cache_key_differs_on_value_change() {
        #[derive(Serialize)]
        struct P {
            x: i32,
        }
        assert_ne!(cache_key("t", &P { x: 1 }), cache_key("t", &P { x: 2 }));
    }
}

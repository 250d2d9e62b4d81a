use clickhouse::Client;

/// Idempotent DDL for the `nearyou` ClickHouse schema. Grounded on the
/// teacher's `migrations.rs` (ordered `&[&str]`, `IF NOT EXISTS` everywhere)
/// and on the table shapes in `materialized_views.py` / `operators.py`.
const MIGRATIONS: &[&str] = &[
    "CREATE DATABASE IF NOT EXISTS nearyou",
    r"CREATE TABLE IF NOT EXISTS nearyou.user_events
(
    event_id   UInt64,
    event_time DateTime,
    user_id    UInt64,
    latitude   Float64,
    longitude  Float64,
    poi_range  Float64,
    poi_name   String,
    poi_info   String
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(event_time)
ORDER BY (user_id, event_time)",
    r"CREATE TABLE IF NOT EXISTS nearyou.users
(
    user_id    UInt64,
    age        UInt8,
    profession String,
    interests  String
)
ENGINE = ReplacingMergeTree()
ORDER BY user_id",
    r"CREATE TABLE IF NOT EXISTS nearyou.monthly_shop_summary
(
    month           Date,
    shop_id         String,
    total_visits    UInt64,
    unique_visitors UInt64,
    avg_distance    Float64,
    calculated_at   DateTime
)
ENGINE = ReplacingMergeTree(calculated_at)
PARTITION BY toYYYYMM(month)
ORDER BY (month, shop_id)",
    r"CREATE TABLE IF NOT EXISTS nearyou.shop_performance_metrics
(
    shop_id           String,
    period_start      DateTime,
    period_end        DateTime,
    total_impressions UInt64,
    conversion_rate   Float64,
    peak_hour         UInt8,
    avg_dwell_time    Float64,
    updated_at        DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (shop_id, period_start)",
    r"CREATE TABLE IF NOT EXISTS nearyou.user_journey_summary
(
    user_id         UInt64,
    journey_date    Date,
    shops_visited   Array(String),
    total_distance  Float64,
    journey_duration UInt32,
    created_at      DateTime DEFAULT now()
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(journey_date)
ORDER BY (user_id, journey_date)",
    r"CREATE TABLE IF NOT EXISTS nearyou.shop_visits_hourly
(
    shop_id         String,
    hour            DateTime,
    visits          UInt64,
    unique_visitors UInt64,
    avg_distance    Float64
)
ENGINE = ReplacingMergeTree()
PARTITION BY toYYYYMM(hour)
ORDER BY (shop_id, hour)",
    r"CREATE TABLE IF NOT EXISTS nearyou.user_activity_daily
(
    user_id       UInt64,
    day           Date,
    total_events  UInt64,
    unique_shops  UInt64,
    total_distance Float64
)
ENGINE = ReplacingMergeTree()
PARTITION BY toYYYYMM(day)
ORDER BY (user_id, day)",
];

/// Runs every statement in order against `url`/`database`. Safe to call on
/// every binary startup.
pub async fn run(client: &Client) -> anyhow::Result<()> {
    tracing::info!("running clickhouse migrations ({} statements)", MIGRATIONS.len());

    for (i, sql) in MIGRATIONS.iter().enumerate() {
        client.query(sql).execute().await.map_err(|e| {
            tracing::error!("migration {}/{} failed: {e}", i + 1, MIGRATIONS.len());
            e
        })?;
    }

    tracing::info!("clickhouse migrations complete");
    Ok(())
}

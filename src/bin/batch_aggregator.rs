use std::time::Duration;

use clap::Parser;
use clickhouse::Client;

use nearyou::config::ClickHouseConfig;
use nearyou::{init_tracing, migrations};

/// Runs the batch aggregation jobs that populate C8's five projection
/// tables from `user_events`. Grounded on `MaterializedViewManager` in
/// `materialized_views.py`: `refresh_monthly_summary`,
/// `calculate_shop_performance`, `aggregate_user_journeys`, plus the two
/// hourly/daily projections whose DDL spec.md §9 leaves to the
/// implementation.
#[derive(Parser)]
#[command(name = "nearyou-batch-aggregator")]
struct Cli {
    /// Run the aggregation jobs once and exit, instead of looping.
    #[arg(long)]
    once: bool,
    /// Seconds between runs when not using `--once`.
    #[arg(long, default_value_t = 3600)]
    interval_seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("nearyou_batch_aggregator=info");

    let cli = Cli::parse();
    let ch = ClickHouseConfig::from_env().client();
    migrations::run(&ch).await?;

    loop {
        match run_batch_aggregations(&ch).await {
            Ok(()) => tracing::info!("batch aggregation run complete"),
            Err(err) => tracing::error!(error = %err, "batch aggregation run failed"),
        }

        if cli.once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(cli.interval_seconds)).await;
    }

    Ok(())
}

async fn run_batch_aggregations(ch: &Client) -> anyhow::Result<()> {
    refresh_monthly_summary(ch).await?;
    calculate_shop_performance(ch).await?;
    aggregate_user_journeys(ch).await?;
    refresh_shop_visits_hourly(ch).await?;
    refresh_user_activity_daily(ch).await?;
    Ok(())
}

/// `monthly_shop_summary`: visit counts, unique visitors, and average
/// distance per shop for the current calendar month (spec.md §4.6: "for
/// the current calendar month", the original's `>= current_month AND <
/// current_month + 1 month`). Bounded below at `toStartOfMonth(now())`
/// only — `now()` is itself always within the current month, so no upper
/// bound is needed. Grounded on `refresh_monthly_summary`.
async fn refresh_monthly_summary(ch: &Client) -> anyhow::Result<()> {
    const SQL: &str = r"
        INSERT INTO nearyou.monthly_shop_summary
        SELECT
            toStartOfMonth(event_time) AS month,
            poi_name AS shop_id,
            count() AS total_visits,
            uniqExact(user_id) AS unique_visitors,
            avg(poi_range) AS avg_distance,
            now() AS calculated_at
        FROM nearyou.user_events
        WHERE poi_name != '' AND event_time >= toStartOfMonth(now())
        GROUP BY month, shop_id
    ";
    ch.query(SQL).execute().await?;
    Ok(())
}

/// `shop_performance_metrics`: impressions, conversion rate, peak hour, and
/// average dwell time over the trailing N=7 days (spec.md §4.6). `peak_hour`
/// is `argMax(hour, impressions)` rather than the source's plain mode, since
/// ClickHouse has no built-in mode aggregate (spec.md §9 Open Question).
/// `avg_dwell_time = avg(poi_range)` per spec.md §4.6 and the original's
/// `calculate_shop_performance`. Grounded on `calculate_shop_performance`.
async fn calculate_shop_performance(ch: &Client) -> anyhow::Result<()> {
    const SQL: &str = r"
        INSERT INTO nearyou.shop_performance_metrics
        SELECT
            shop_id,
            min(period_start) AS period_start,
            max(period_end) AS period_end,
            sum(total_impressions) AS total_impressions,
            sum(messages) / sum(total_impressions) AS conversion_rate,
            argMax(hour, total_impressions) AS peak_hour,
            avg(avg_distance) AS avg_dwell_time,
            now() AS updated_at
        FROM (
            SELECT
                poi_name AS shop_id,
                toHour(event_time) AS hour,
                min(event_time) AS period_start,
                max(event_time) AS period_end,
                count() AS total_impressions,
                countIf(poi_info != '') AS messages,
                avg(poi_range) AS avg_distance
            FROM nearyou.user_events
            WHERE poi_name != '' AND event_time >= now() - INTERVAL 7 DAY
            GROUP BY shop_id, hour
        )
        GROUP BY shop_id
    ";
    ch.query(SQL).execute().await?;
    Ok(())
}

/// `user_journey_summary`: one row per user for yesterday (UTC date), the
/// ordered list of shops visited within the proximity threshold, total
/// distance, and session span; emitted only when `shops_visited` is
/// non-empty (spec.md §4.6). Grounded on `aggregate_user_journeys`.
async fn aggregate_user_journeys(ch: &Client) -> anyhow::Result<()> {
    const SQL: &str = r"
        INSERT INTO nearyou.user_journey_summary
        SELECT
            user_id,
            journey_date,
            groupArray(poi_name) AS shops_visited,
            sum(poi_range) AS total_distance,
            toUInt32(dateDiff('second', min(event_time), max(event_time))) AS journey_duration,
            now() AS created_at
        FROM (
            SELECT user_id, toDate(event_time) AS journey_date, event_time, poi_name, poi_range
            FROM nearyou.user_events
            WHERE toDate(event_time) = yesterday() AND poi_name != ''
            ORDER BY user_id, event_time
        )
        GROUP BY user_id, journey_date
        HAVING length(shops_visited) > 0
    ";
    ch.query(SQL).execute().await?;
    Ok(())
}

/// `shop_visits_hourly` projection read by C9's `/timeseries` batch path
/// (spec.md §9: `hour, visits, unique_visitors, avg_distance`).
async fn refresh_shop_visits_hourly(ch: &Client) -> anyhow::Result<()> {
    const SQL: &str = r"
        INSERT INTO nearyou.shop_visits_hourly
        SELECT
            poi_name AS shop_id,
            toStartOfHour(event_time) AS hour,
            count() AS visits,
            uniqExact(user_id) AS unique_visitors,
            avg(poi_range) AS avg_distance
        FROM nearyou.user_events
        WHERE poi_name != '' AND event_time >= now() - INTERVAL 1 DAY
        GROUP BY shop_id, hour
    ";
    ch.query(SQL).execute().await?;
    Ok(())
}

/// `user_activity_daily` projection read by C9's `/timeseries` batch path
/// (spec.md §9: `user_id, day, total_events, unique_shops, total_distance`).
async fn refresh_user_activity_daily(ch: &Client) -> anyhow::Result<()> {
    const SQL: &str = r"
        INSERT INTO nearyou.user_activity_daily
        SELECT
            user_id,
            toDate(event_time) AS day,
            count() AS total_events,
            uniqExactIf(poi_name, poi_name != '') AS unique_shops,
            sum(poi_range) AS total_distance
        FROM nearyou.user_events
        WHERE event_time >= now() - INTERVAL 1 DAY
        GROUP BY user_id, day
    ";
    ch.query(SQL).execute().await?;
    Ok(())
}

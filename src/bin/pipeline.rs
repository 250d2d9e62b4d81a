use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use nearyou::config::{ClickHouseConfig, KafkaConfig, PostgresConfig};
use nearyou::events::EventSink;
use nearyou::generator_client::MessageGeneratorClient;
use nearyou::geo::SpatialIndex;
use nearyou::profiles::ProfileStore;
use nearyou::replay::ReplayController;
use nearyou::{PipelineContext, init_tracing, migrations, pipeline};

/// Runs or replays the GPS enrichment dataflow (C6/C7).
#[derive(Parser)]
#[command(name = "nearyou-pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consume the live `gps_stream` topic and enrich events as they arrive (C6).
    Run,
    /// Replay a historical window through the same enrichment stages, without
    /// committing offsets (C7).
    Replay {
        /// Replay the last N hours. Ignored if `--start`/`--end` are given.
        #[arg(long, default_value_t = 24)]
        hours: i64,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("nearyou_pipeline=info");

    let cli = Cli::parse();

    let kafka_cfg = KafkaConfig::from_env();
    let ch_cfg = ClickHouseConfig::from_env();
    let pg_cfg = PostgresConfig::from_env();

    let ch = ch_cfg.client();
    migrations::run(&ch).await?;

    let spatial = SpatialIndex::connect(&pg_cfg).await?;
    let profiles = ProfileStore::new(ch.clone());
    let generator_url = std::env::var("MESSAGE_GENERATOR_URL")
        .unwrap_or_else(|_| "http://message-generator:8001".to_string());
    let generator = MessageGeneratorClient::new(generator_url);
    let sink = EventSink::new(ch.clone());

    let ctx = Arc::new(PipelineContext { spatial, profiles, generator, sink });

    match cli.command {
        Command::Run => {
            let consumer = pipeline::build_consumer(&kafka_cfg)?;
            tracing::info!(topic = %kafka_cfg.topic, "starting live enrichment dataflow");
            pipeline::run(consumer, ctx).await
        }
        Command::Replay { hours, start, end } => {
            let consumer = pipeline::build_replay_consumer(&kafka_cfg)?;
            let controller = ReplayController::new(consumer, ctx);

            let summary = match (start, end) {
                (Some(start), Some(end)) => controller.replay_time_range(&kafka_cfg.topic, start, end).await?,
                _ => controller.replay_last_n_hours(&kafka_cfg.topic, hours).await?,
            };

            tracing::info!(processed = summary.processed, sunk = summary.sunk, "replay complete");
            Ok(())
        }
    }
}

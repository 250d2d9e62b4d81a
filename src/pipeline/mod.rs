pub mod router;
pub mod stages;

use std::sync::Arc;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;

use crate::PipelineContext;
use crate::config::KafkaConfig;
use router::PartitionRouter;
use stages::RawRecord;

/// Builds the SSL-authenticated consumer described in spec.md §6: CA,
/// client cert, client key, explicit commit, `latest` reset on new groups.
pub fn build_consumer(cfg: &KafkaConfig) -> anyhow::Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &cfg.broker)
        .set("group.id", &cfg.consumer_group)
        .set("security.protocol", "SSL")
        .set("ssl.ca.location", &cfg.ssl_cafile)
        .set("ssl.certificate.location", &cfg.ssl_certfile)
        .set("ssl.key.location", &cfg.ssl_keyfile)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "latest")
        .create()?;

    consumer.subscribe(&[&cfg.topic])?;
    Ok(consumer)
}

/// Builds a second consumer for C7 replay: same SSL transport, but its own
/// consumer group (so it never disturbs the live group's committed offsets)
/// and no `subscribe()` — replay assigns partitions/offsets manually via
/// `ReplayController::seek_to_timestamp`, which a subscribed (rebalancing)
/// consumer cannot do.
pub fn build_replay_consumer(cfg: &KafkaConfig) -> anyhow::Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &cfg.broker)
        .set("group.id", format!("{}-replay", cfg.consumer_group))
        .set("security.protocol", "SSL")
        .set("ssl.ca.location", &cfg.ssl_cafile)
        .set("ssl.certificate.location", &cfg.ssl_certfile)
        .set("ssl.key.location", &cfg.ssl_keyfile)
        .set("enable.auto.commit", "false")
        .create()?;

    Ok(consumer)
}

/// Runs the live enrichment dataflow (C6): read from Kafka, dispatch by
/// `user_id` to per-partition workers, commit explicitly after each record
/// is handed off (at-least-once; duplicate sink writes are tolerated per
/// spec.md §4.4).
pub async fn run(consumer: StreamConsumer, ctx: Arc<PipelineContext>) -> anyhow::Result<()> {
    let mut router = PartitionRouter::new(ctx);

    loop {
        match consumer.recv().await {
            Ok(msg) => {
                let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();
                let offset = Some(msg.offset() as u64);

                router.dispatch(RawRecord { payload, offset });

                if let Err(err) = consumer.commit_message(&msg, CommitMode::Async) {
                    tracing::error!(error = %err, "offset commit failed");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "kafka recv error, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

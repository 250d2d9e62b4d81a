use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};

use crate::PipelineContext;
use crate::pipeline::stages::{self, RawRecord};

/// Replay outcome (C7). Grounded on the counters `StreamReplayManager`
/// returns from `replay_time_range` in `stream_replay.py`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplaySummary {
    pub processed: u64,
    pub sunk: u64,
}

/// Re-runs a bounded historical window of `gps_stream` through the same
/// five enrichment stages the live pipeline uses, without ever committing
/// offsets — replay must never perturb the live consumer group's progress.
/// Grounded on `StreamReplayManager` in `stream_replay.py`; reimplemented
/// against `rdkafka`'s `offsets_for_times`/`assign` in place of
/// `aiokafka`'s `seek_to_timestamp`.
pub struct ReplayController {
    consumer: StreamConsumer,
    ctx: Arc<PipelineContext>,
}

impl ReplayController {
    pub fn new(consumer: StreamConsumer, ctx: Arc<PipelineContext>) -> Self {
        Self { consumer, ctx }
    }

    /// Replays every record in `[start, end]` on `topic`.
    pub async fn replay_time_range(
        &self,
        topic: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<ReplaySummary> {
        let partition_count = self.seek_to_timestamp(topic, start)?;
        self.drain_until(end, partition_count).await
    }

    /// Convenience wrapper matching `replay_last_n_hours`.
    pub async fn replay_last_n_hours(&self, topic: &str, hours: i64) -> anyhow::Result<ReplaySummary> {
        let end = Utc::now();
        let start = end - chrono::Duration::hours(hours);
        self.replay_time_range(topic, start, end).await
    }

    /// Resolves each partition's earliest offset at or after `start` via
    /// `offsets_for_times`, then assigns the consumer directly to those
    /// offsets (no subscribe/rebalance — this consumer never joins the live
    /// group). Returns the number of partitions assigned.
    fn seek_to_timestamp(&self, topic: &str, start: DateTime<Utc>) -> anyhow::Result<usize> {
        let metadata = self.consumer.fetch_metadata(Some(topic), Duration::from_secs(10))?;
        let topic_meta = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| anyhow::anyhow!("topic {topic} not found in broker metadata"))?;

        let mut lookup = TopicPartitionList::new();
        for partition in topic_meta.partitions() {
            lookup.add_partition_offset(topic, partition.id(), Offset::Offset(start.timestamp_millis()))?;
        }

        let resolved = self.consumer.offsets_for_times(lookup, Duration::from_secs(10))?;

        let mut assignment = TopicPartitionList::new();
        let mut assigned = 0;
        for elem in resolved.elements() {
            let offset = match elem.offset() {
                Offset::Offset(o) => o,
                _ => continue, // no message at or after `start` on this partition
            };
            assignment.add_partition_offset(topic, elem.partition(), Offset::Offset(offset))?;
            assigned += 1;
        }

        self.consumer.assign(&assignment)?;
        Ok(assigned)
    }

    /// Consumes until either every assigned partition has produced a record
    /// at or after `end`, or no partition has produced anything for 5s
    /// (the replay window ran dry). Offsets are never committed.
    async fn drain_until(&self, end: DateTime<Utc>, partition_count: usize) -> anyhow::Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        if partition_count == 0 {
            return Ok(summary);
        }

        let mut memo = HashMap::new();
        let mut past_end: HashSet<i32> = HashSet::new();
        let end_ms = end.timestamp_millis();

        loop {
            let msg = match tokio::time::timeout(Duration::from_secs(5), self.consumer.recv()).await {
                Ok(Ok(msg)) => msg,
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "replay recv error");
                    continue;
                }
                Err(_) => break,
            };

            if msg.timestamp().to_millis().unwrap_or(i64::MAX) > end_ms {
                past_end.insert(msg.partition());
                if past_end.len() >= partition_count {
                    break;
                }
                continue;
            }

            let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();
            let record = RawRecord { payload, offset: Some(msg.offset() as u64) };

            summary.processed += 1;
            if stages::process_record(&self.ctx, record, &mut memo).await {
                summary.sunk += 1;
            }
        }

        Ok(summary)
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::stages::{self, RawRecord};
use crate::PipelineContext;

const PARTITION_QUEUE_DEPTH: usize = 256;

/// Dispatches raw records to a per-`user_id` worker task, giving per-user
/// FIFO processing with cross-user parallelism without a shared scheduler
/// (spec.md §9 "Per-user ordering without a global scheduler").
pub struct PartitionRouter {
    ctx: Arc<PipelineContext>,
    workers: HashMap<u64, mpsc::Sender<RawRecord>>,
}

impl PartitionRouter {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            ctx,
            workers: HashMap::new(),
        }
    }

    /// Routes a record by its `user_id` (parsed from the raw JSON without a
    /// full decode, so routing survives a malformed payload and still lets
    /// the worker's own decode stage log and drop it).
    pub fn dispatch(&mut self, record: RawRecord) {
        let user_id = peek_user_id(&record.payload);

        let sender = self.workers.entry(user_id).or_insert_with(|| {
            let (tx, rx) = mpsc::channel(PARTITION_QUEUE_DEPTH);
            spawn_worker(self.ctx.clone(), rx);
            tx
        });

        if sender.try_send(record).is_err() {
            tracing::warn!(user_id, "partition queue full or closed, dropping record");
        }
    }

    pub fn partition_count(&self) -> usize {
        self.workers.len()
    }
}

fn peek_user_id(payload: &[u8]) -> u64 {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("user_id").and_then(|u| u.as_u64()))
        .unwrap_or(0)
}

fn spawn_worker(ctx: Arc<PipelineContext>, mut rx: mpsc::Receiver<RawRecord>) {
    tokio::spawn(async move {
        let mut memo = HashMap::new();
        while let Some(record) = rx.recv().await {
            stages::process_record(&ctx, record, &mut memo).await;
        }
    });
}

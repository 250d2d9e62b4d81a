use clickhouse::Client;

use crate::models::EnrichedEvent;

/// Sink for enriched events into ClickHouse's `user_events` table (C4).
/// Grounded on `write_to_clickhouse` in `operators.py`; uses a single insert
/// per event rather than the original's batch-of-one, since the pipeline
/// already fans events out one-at-a-time per partition worker.
#[derive(Clone)]
pub struct EventSink {
    client: Client,
}

impl EventSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn insert(&self, event: &EnrichedEvent) -> anyhow::Result<()> {
        let mut insert = self.client.insert("user_events")?;
        insert.write(event).await?;
        insert.end().await?;
        Ok(())
    }
}

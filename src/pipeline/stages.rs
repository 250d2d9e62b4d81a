use chrono::{NaiveDateTime, Timelike};

use crate::PipelineContext;
use crate::models::{EnrichedEvent, GpsEvent, PROXIMITY_THRESHOLD_M};

/// Outcome of a stage. Stages never return `Result` — every failure mode
/// named in spec.md §7 is a `Drop`, not a propagated error, so the worker
/// loop can never be killed by a single bad record.
pub enum StageOutcome<T> {
    Continue(T),
    Drop { reason: &'static str },
}

/// Raw bytes off the wire, as handed to the decode stage.
pub struct RawRecord {
    pub payload: Vec<u8>,
    pub offset: Option<u64>,
}

/// Stage 1 — decode. UTF-8 + JSON-parse; attaches the broker offset used as
/// `event_id` downstream (spec.md §9 Open Question: prefer broker offset).
pub fn decode(record: RawRecord) -> StageOutcome<GpsEvent> {
    let text = match std::str::from_utf8(&record.payload) {
        Ok(t) => t,
        Err(_) => return StageOutcome::Drop { reason: "invalid utf-8" },
    };

    match serde_json::from_str::<GpsEvent>(text) {
        Ok(mut event) => {
            event.offset = record.offset;
            StageOutcome::Continue(event)
        }
        Err(_) => StageOutcome::Drop { reason: "invalid json" },
    }
}

/// Stage 2 — validate. `user_id` presence is guaranteed by `GpsEvent`'s
/// required field at the deserializer level; this stage re-asserts the
/// record shape the way the source's separate validate step does.
pub fn validate(event: GpsEvent) -> StageOutcome<GpsEvent> {
    if !(-90.0..=90.0).contains(&event.latitude) || !(-180.0..=180.0).contains(&event.longitude) {
        return StageOutcome::Drop { reason: "coordinates out of range" };
    }
    StageOutcome::Continue(event)
}

pub struct JoinedEvent {
    pub event: GpsEvent,
    pub poi: crate::models::Poi,
}

/// Stage 3 — nearest-POI join (calls C2).
pub async fn join_nearest_poi(ctx: &PipelineContext, event: GpsEvent) -> StageOutcome<JoinedEvent> {
    match ctx.spatial.nearest(event.latitude, event.longitude).await {
        Ok(Some(poi)) => StageOutcome::Continue(JoinedEvent { event, poi }),
        Ok(None) => StageOutcome::Drop { reason: "no poi in spatial index" },
        Err(err) => {
            tracing::error!(error = %err, "spatial index query failed");
            StageOutcome::Drop { reason: "spatial index error" }
        }
    }
}

/// Stage 4 — proximity gate + generate (calls C3, C5). Memoisation by
/// `(user_id, shop_id)` is applied by the caller (`PartitionWorker`), since
/// it must persist across events within a worker's lifetime.
pub async fn generate_message(
    ctx: &PipelineContext,
    joined: &JoinedEvent,
    memo: &mut std::collections::HashMap<(u64, i64), String>,
) -> String {
    if joined.poi.distance_m > PROXIMITY_THRESHOLD_M {
        return String::new();
    }

    let profile = match ctx.profiles.get(joined.event.user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return String::new(),
        Err(err) => {
            tracing::error!(error = %err, "profile lookup failed, treating as missing");
            return String::new();
        }
    };

    let memo_key = (joined.event.user_id, joined.poi.shop_id);
    if let Some(cached) = memo.get(&memo_key) {
        return cached.clone();
    }

    let message = ctx
        .generator
        .generate(&profile, &joined.poi)
        .await
        .unwrap_or_default();

    if !message.is_empty() {
        memo.insert(memo_key, message.clone());
    }

    message
}

/// Builds the sink-ready row from a joined event and its generated message.
pub fn build_enriched_event(joined: &JoinedEvent, poi_info: String) -> EnrichedEvent {
    let event_time = joined
        .event
        .timestamp
        .naive_utc();

    EnrichedEvent {
        event_id: joined.event.offset.unwrap_or(0),
        event_time: naive_seconds(event_time),
        user_id: joined.event.user_id,
        latitude: joined.event.latitude,
        longitude: joined.event.longitude,
        poi_range: joined.poi.distance_m,
        poi_name: joined.poi.shop_name.clone(),
        poi_info,
    }
}

fn naive_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Stage 5 — sink (calls C4). Failures are logged, never propagated.
pub async fn sink(ctx: &PipelineContext, event: &EnrichedEvent) {
    if let Err(err) = ctx.sink.insert(event).await {
        tracing::error!(error = %err, user_id = event.user_id, "sink write failed, event lost");
        return;
    }
    if !event.poi_info.is_empty() {
        tracing::info!(user_id = event.user_id, poi = %event.poi_name, "enriched event with message sunk");
    }
}

/// Runs all five stages for one raw record. Returns `true` if the event
/// reached the sink.
pub async fn process_record(
    ctx: &PipelineContext,
    record: RawRecord,
    memo: &mut std::collections::HashMap<(u64, i64), String>,
) -> bool {
    let event = match decode(record) {
        StageOutcome::Continue(e) => e,
        StageOutcome::Drop { reason } => {
            tracing::warn!(reason, "dropped at decode");
            return false;
        }
    };

    let event = match validate(event) {
        StageOutcome::Continue(e) => e,
        StageOutcome::Drop { reason } => {
            tracing::warn!(reason, "dropped at validate");
            return false;
        }
    };

    let joined = match join_nearest_poi(ctx, event).await {
        StageOutcome::Continue(j) => j,
        StageOutcome::Drop { reason } => {
            tracing::warn!(reason, "dropped at nearest-poi join");
            return false;
        }
    };

    let poi_info = generate_message(ctx, &joined, memo).await;
    let enriched = build_enriched_event(&joined, poi_info);
    sink(ctx, &enriched).await;
    true
}

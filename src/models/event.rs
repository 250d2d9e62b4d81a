use chrono::{DateTime, NaiveDateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};

/// Raw GPS event as produced by the synthetic agents (spec.md §3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpsEvent {
    pub user_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    /// Broker offset, if the ingress stage could attach one. Used as `event_id`.
    #[serde(skip)]
    pub offset: Option<u64>,
}

/// A point of interest, as returned by the nearest-POI spatial query (C2).
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub shop_id: i64,
    pub shop_name: String,
    pub category: String,
    pub distance_m: f64,
}

/// Immutable user attributes (C3).
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: u64,
    pub age: u8,
    pub profession: String,
    pub interests: String,
}

/// Proximity threshold beyond which no personalised message is generated (metres).
pub const PROXIMITY_THRESHOLD_M: f64 = 200.0;

/// The enriched, sink-ready event (spec.md §3). `poi_info` is empty unless
/// invariant 2 holds: distance within threshold, a profile existed, and
/// generation produced a non-empty body.
#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct EnrichedEvent {
    pub event_id: u64,
    pub event_time: NaiveDateTime,
    pub user_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub poi_range: f64,
    pub poi_name: String,
    pub poi_info: String,
}

/// ClickHouse row shape for the `users` profile table (C3/C9 read path).
#[derive(Debug, Clone, Deserialize, Row)]
pub struct UserProfileRow {
    pub user_id: u64,
    pub age: u8,
    pub profession: String,
    pub interests: String,
}

impl From<UserProfileRow> for UserProfile {
    fn from(r: UserProfileRow) -> Self {
        Self {
            user_id: r.user_id,
            age: r.age,
            profession: r.profession,
            interests: r.interests,
        }
    }
}

/// Row shape returned by the PostGIS nearest-shop query (C2).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PoiRow {
    pub shop_id: i64,
    pub shop_name: String,
    pub category: String,
    pub distance: f64,
}

impl From<PoiRow> for Poi {
    fn from(r: PoiRow) -> Self {
        Self {
            shop_id: r.shop_id,
            shop_name: r.shop_name,
            category: r.category,
            distance_m: r.distance,
        }
    }
}

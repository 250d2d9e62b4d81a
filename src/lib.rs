pub mod cache;
pub mod config;
pub mod events;
pub mod fingerprint;
pub mod generator;
pub mod generator_client;
pub mod geo;
pub mod handlers;
pub mod llm;
pub mod migrations;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod profiles;
pub mod query_builder;
pub mod replay;

use clickhouse::Client;
use std::sync::Arc;

use cache::CacheHandle;
use events::EventSink;
use generator::GeneratorService;
use generator_client::MessageGeneratorClient;
use geo::SpatialIndex;
use profiles::ProfileStore;

/// Shared dependency bundle for the query-service binary (C9). Mirrors the
/// teacher's `AppState { ch, config_db }`: one struct, cloned per request,
/// holding long-lived client handles rather than module globals. C9 never
/// queries PostGIS directly (spec.md §4.7's six endpoints all route
/// between ClickHouse and the result cache), so no Postgres pool is held
/// here — that connection belongs to C6/C7's `SpatialIndex`.
#[derive(Clone)]
pub struct AppState {
    pub ch: Client,
    pub cache: CacheHandle,
}

/// Shared dependency bundle for the message-generator binary (C5).
#[derive(Clone)]
pub struct GeneratorState {
    pub generator: Arc<GeneratorService>,
    pub provider: String,
}

/// Collaborators the enrichment dataflow (C6/C7) needs per event: spatial
/// index, profile store, message generator, and sink.
#[derive(Clone)]
pub struct PipelineContext {
    pub spatial: SpatialIndex,
    pub profiles: ProfileStore,
    pub generator: MessageGeneratorClient,
    pub sink: EventSink,
}

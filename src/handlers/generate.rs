use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::GeneratorState;
use crate::generator::{CacheStats, PoiDescriptor};
use crate::models::UserProfile;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    user: GenerateUser,
    poi: GeneratePoi,
}

#[derive(Debug, Deserialize)]
struct GenerateUser {
    age: u8,
    profession: String,
    interests: String,
}

#[derive(Debug, Deserialize)]
struct GeneratePoi {
    name: String,
    category: String,
    description: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    message: String,
    cached: bool,
}

/// `POST /generate` (C5). Grounded on `generate_message` in
/// `services/message_generator/api/routes.py` plus
/// `GeneratorService.generate_message`. `user_id` is not part of this wire
/// shape — fingerprinting only needs age/profession/interests, never the
/// caller's identity.
pub async fn generate(State(state): State<GeneratorState>, Json(req): Json<GenerateRequest>) -> impl IntoResponse {
    let profile = UserProfile {
        user_id: 0,
        age: req.user.age,
        profession: req.user.profession,
        interests: req.user.interests,
    };
    let poi = PoiDescriptor { name: req.poi.name, category: req.poi.category, description: req.poi.description };

    let (message, cached) = state.generator.generate(&profile, &poi).await;
    Json(GenerateResponse { message, cached })
}

/// `GET /health` (C5).
pub async fn health(State(state): State<GeneratorState>) -> Json<Value> {
    Json(json!({ "status": "ok", "provider": state.provider }))
}

/// `GET /cache/stats` (C5). Grounded on the stats bookkeeping in `cache_utils.py`.
pub async fn cache_stats(State(state): State<GeneratorState>) -> Json<CacheStats> {
    Json(state.generator.stats())
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{Poi, UserProfile};

#[derive(Debug, Serialize)]
struct GenerateRequestBody {
    user: GenerateUser,
    poi: GeneratePoi,
}

#[derive(Debug, Serialize)]
struct GenerateUser {
    age: u8,
    profession: String,
    interests: String,
}

#[derive(Debug, Serialize)]
struct GeneratePoi {
    name: String,
    category: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponseBody {
    message: String,
}

/// HTTP client for C5's `/generate` endpoint, used by the C6 dataflow's
/// proximity-gate stage. Grounded on `_generate_message` in `operators.py`.
#[derive(Clone)]
pub struct MessageGeneratorClient {
    http: reqwest::Client,
    base_url: String,
}

impl MessageGeneratorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
        }
    }

    /// Calls `/generate`. Returns `None` on any transport or status failure;
    /// the caller treats that as an empty `poi_info` (spec.md §4.4).
    pub async fn generate(&self, profile: &UserProfile, poi: &Poi) -> Option<String> {
        let body = GenerateRequestBody {
            user: GenerateUser {
                age: profile.age,
                profession: profile.profession.clone(),
                interests: profile.interests.clone(),
            },
            poi: GeneratePoi {
                name: poi.shop_name.clone(),
                category: poi.category.clone(),
                description: format!("Negozio a {:.0}m di distanza", poi.distance_m),
            },
        };

        let resp = self
            .http
            .post(format!("{}/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| tracing::error!(error = %err, "generator call failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::error!(status = %resp.status(), "generator returned error status");
            return None;
        }

        resp.json::<GenerateResponseBody>()
            .await
            .map_err(|err| tracing::error!(error = %err, "generator response parse failed"))
            .ok()
            .map(|b| b.message)
    }
}

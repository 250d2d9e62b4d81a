use async_trait::async_trait;
use langchain_rust::language_models::llm::LLM;
use langchain_rust::language_models::options::CallOptions;
use langchain_rust::llm::openai::{OpenAI, OpenAIConfig};

use crate::config::LlmConfig;

/// Inputs to a single promotional-message generation (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub age: u8,
    pub profession: String,
    pub interests: String,
    pub poi_name: String,
    pub poi_category: String,
    pub poi_description: String,
}

const PROMPT_TEMPLATE: &str = r#"Sei un assistente che scrive brevi messaggi promozionali personalizzati per un'app di mobilità urbana.

Profilo utente:
- Età: {age}
- Professione: {profession}
- Interessi: {interests}

Punto di interesse nelle vicinanze:
- Nome: {name}
- Categoria: {category}
- Descrizione: {description}

Scrivi un messaggio breve (massimo 2 frasi), amichevole e pertinente agli interessi dell'utente, che lo inviti a visitare questo posto."#;

fn render_prompt(req: &GenerationRequest) -> String {
    PROMPT_TEMPLATE
        .replace("{age}", &req.age.to_string())
        .replace("{profession}", &req.profession)
        .replace("{interests}", &req.interests)
        .replace("{name}", &req.poi_name)
        .replace("{category}", &req.poi_category)
        .replace("{description}", &req.poi_description)
}

/// Deterministic per-category fallback, used whenever the LLM call fails.
/// Grounded on `_get_fallback_message` in `generator_service.py`; fallback
/// results must never be cached (spec.md §4.3).
pub fn fallback_message(poi_name: &str, poi_category: &str) -> String {
    match poi_category.to_lowercase().as_str() {
        "ristorante" => format!("Sei vicino a {poi_name}! Un ottimo posto per una pausa pranzo gustosa."),
        "bar" => format!("{poi_name} è a pochi passi! Che ne dici di un ottimo caffè?"),
        "abbigliamento" => format!("Dai un'occhiata alle offerte di {poi_name} proprio qui vicino!"),
        "supermercato" => format!("{poi_name} è qui vicino, perfetto per fare la spesa velocemente."),
        _ => format!("Sei vicino a {poi_name}! Fermati a dare un'occhiata."),
    }
}

/// LLM-backed generator seam. A trait lets the HTTP handler layer stay
/// decoupled from the concrete provider, and lets tests substitute a stub.
/// Returns `Err` on any provider failure so the caller (`GeneratorService`)
/// can apply the fallback itself and know not to cache it (spec.md §4.3(e)).
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> anyhow::Result<String>;
}

/// `langchain-rust` OpenAI-compatible client, pointed at whichever provider
/// `LLM_PROVIDER`/`OPENAI_API_BASE` select (the source supports Groq and
/// OpenAI-compatible endpoints interchangeably via the same client shape).
pub struct OpenAiGenerator {
    llm: OpenAI<OpenAIConfig>,
}

impl OpenAiGenerator {
    pub fn new(cfg: &LlmConfig) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(&cfg.api_key);
        if let Some(base) = &cfg.api_base {
            config = config.with_api_base(base);
        }

        let llm = OpenAI::default()
            .with_config(config)
            .with_options(CallOptions::new().with_temperature(0.7));

        Self { llm }
    }
}

#[async_trait]
impl MessageGenerator for OpenAiGenerator {
    async fn generate(&self, req: &GenerationRequest) -> anyhow::Result<String> {
        let prompt = render_prompt(req);
        let message = self.llm.invoke(&prompt).await?;
        Ok(message.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_category_template() {
        assert!(fallback_message("Bar Roma", "bar").contains("caffè"));
        assert!(fallback_message("Negozio X", "sconosciuto").contains("Negozio X"));
    }

    #[test]
    fn prompt_includes_all_fields() {
        let req = GenerationRequest {
            age: 30,
            profession: "Engineer".into(),
            interests: "hiking".into(),
            poi_name: "Bar Roma".into(),
            poi_category: "bar".into(),
            poi_description: "Negozio a 50m di distanza".into(),
        };
        let prompt = render_prompt(&req);
        assert!(prompt.contains("Bar Roma"));
        assert!(prompt.contains("hiking"));
        assert!(prompt.contains("Engineer"));
    }
}

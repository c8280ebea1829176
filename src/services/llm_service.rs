//! Generador de itinerarios vía la API de Gemini
//!
//! Expone el trait `ItineraryGenerator` que el orquestador consume, más la
//! implementación concreta contra Gemini y el parseo tolerante de la salida
//! (el modelo a veces envuelve el JSON en fences de markdown).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::travel::TravelResponse;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Errores del generador externo
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Request to generator timed out")]
    Timeout,

    #[error("Generator returned an empty response")]
    EmptyResponse,
}

/// Texto crudo producido por el generador, con su consumo de tokens
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    pub total_tokens: Option<u64>,
}

/// Contrato del generador de itinerarios
///
/// El orquestador solo depende de este trait; en tests se sustituye por un
/// generador con respuestas predefinidas.
#[async_trait]
pub trait ItineraryGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedText, LlmError>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

/// Cliente de Gemini
pub struct GeminiGenerator {
    api_key: String,
    model_name: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model_name: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            model_name,
            client,
        }
    }
}

#[async_trait]
impl ItineraryGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedText, LlmError> {
        log::info!("🤖 Calling generator model: {}", self.model_name);

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model_name, self.api_key
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                top_p: 0.95,
                max_output_tokens: 8192,
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Generator failed with status {}: {}", status, error_text);
            return Err(LlmError::Upstream(format!(
                "Generator returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("Failed to parse generator response: {}", e)))?;

        let total_tokens = gemini_response
            .usage_metadata
            .and_then(|usage| usage.total_token_count);

        let text: String = gemini_response
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            log::warn!("⚠️ Generator returned no text");
            return Err(LlmError::EmptyResponse);
        }

        log::info!(
            "✅ Generator responded ({} chars, {:?} tokens)",
            text.len(),
            total_tokens
        );

        Ok(GeneratedText { text, total_tokens })
    }
}

/// Parsear el texto generado a la respuesta estructurada
///
/// Primero intenta el texto tal cual (sin fences de markdown si los trae);
/// si falla, extrae el fragmento entre la primera `{` y la última `}`.
pub fn parse_itinerary(text: &str) -> Result<TravelResponse, serde_json::Error> {
    let cleaned = strip_markdown_fences(text);

    match serde_json::from_str::<TravelResponse>(cleaned) {
        Ok(parsed) => Ok(parsed),
        Err(first_error) => {
            if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
                if start < end {
                    return serde_json::from_str(&cleaned[start..=end]);
                }
            }
            Err(first_error)
        }
    }
}

/// Quitar los fences ```json ... ``` que el modelo agrega a veces
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);

    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

//! Script generation: prompt building and the generative-AI text model
//! client. The model is an opaque collaborator returning raw text.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Opaque script generator: prompt in, raw text out.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> PipelineResult<String>;
}

/// Deterministic generator prompt embedding topic, roster and free-text
/// info, with an explicit instruction that speaker names in the output must
/// exactly match the provided host/guest names.
pub fn build_prompt(topic: &str, host: &str, guests: &[String], info: Option<&str>) -> String {
    let guest_line = if guests.is_empty() {
        "No guests; the host speaks alone.".to_string()
    } else {
        format!("Guests: {}.", guests.join(", "))
    };
    let info_line = info
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("No additional background information provided.");
    format!(
        "Write a podcast dialogue script about \"{topic}\".\n\
         The host is {host}. {guest_line}\n\
         Background information: {info_line}\n\
         Respond with ONLY a JSON array, no prose and no Markdown fences. \
         Each element must be an object with exactly two string fields, \
         \"speaker\" and \"text\". The \"speaker\" value must exactly match \
         one of the host/guest names given above."
    )
}

/// Gemini `generateContent` REST client.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }

    /// Point at an alternate endpoint or model (self-hosted proxies, tests).
    pub fn with_endpoint(mut self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.model = model.into();
        self
    }
}

/// Pull the first candidate's text out of a `generateContent` response.
fn extract_text(body: &Value) -> Option<String> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

#[async_trait]
impl ScriptGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> PipelineResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        debug!(model = self.model.as_str(), "requesting script");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::Generator(e.to_string()))?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| PipelineError::Generator(format!("response body: {}", e)))?;

        extract_text(&body)
            .ok_or_else(|| PipelineError::Generator("response contains no candidate text".into()))
    }
}

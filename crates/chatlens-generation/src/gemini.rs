//! Gemini `generateContent` client.

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use chatlens_core::config::GenerationConfig;

use crate::adapter::GenerationService;
use crate::error::GenerationError;
use crate::request::GenerationRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Secret<String>,
    model: String,
    base_url: String,
    max_output_tokens: Option<u32>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: Secret<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_output_tokens: None,
        }
    }

    pub fn from_config(config: &GenerationConfig, api_key: Secret<String>) -> Self {
        Self::new(api_key, config.model.clone(), config.base_url.clone())
            .with_max_output_tokens(config.max_output_tokens)
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max: Option<u32>) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let parts = match request {
            GenerationRequest::Text(prompt) => serde_json::json!([{ "text": prompt }]),
            GenerationRequest::Multimodal {
                prompt,
                media,
                media_type,
            } => serde_json::json!([
                { "text": prompt },
                {
                    "inlineData": {
                        "mimeType": media_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(media),
                    }
                },
            ]),
        };

        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
        });
        if let Some(max) = self.max_output_tokens {
            body["generationConfig"] = serde_json::json!({ "maxOutputTokens": max });
        }
        body
    }
}

fn extract_text(resp: GenerateContentResponse) -> Result<String, GenerationError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(GenerationError::InvalidResponse(format!(
            "no candidates returned ({})",
            reason
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::InvalidResponse(format!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl GenerationService for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = self.build_body(request);

        debug!(
            model = %self.model,
            multimodal = request.is_multimodal(),
            prompt_chars = request.prompt().chars().count(),
            "gemini generate request"
        );

        let http_resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "gemini API error");
            return Err(GenerationError::ServiceFailure(format!(
                "HTTP {}: {}",
                status, body_text
            )));
        }

        let raw = http_resp.text().await?;
        trace!(response = %raw, "gemini raw response");

        let resp: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        extract_text(resp)
    }
}

//! Google Gemini model implementation.
//!
//! This module provides an implementation of the `Model` trait for Google's Gemini
//! `generateContent` API, covering the three request shapes the orchestrator uses:
//! plain text, text with inline attachments, and text with Google Search grounding.

use async_trait::async_trait;
use marquee_abstraction::{
    GroundingSource, Model, ModelError, ModelRequest, ModelResponse, ModelUsage, ResponseFormat,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use tracing::{debug, error, warn};

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Maximum size for inline data transmission (20MB after base64 encoding).
pub const MAX_INLINE_SIZE: usize = 20_971_520;

/// Finish reasons that mean the candidate was withheld by the provider.
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII", "RECITATION"];

/// Google Gemini model implementation.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    /// The model ID (e.g., "gemini-2.5-flash").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Gemini API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl GeminiModel {
    /// Creates a new `GeminiModel` with the given model ID.
    ///
    /// # Errors
    /// Returns a `ModelError` if `GEMINI_API_KEY` is not set.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            ModelError::UnsupportedModelProvider(
                "GEMINI_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `GeminiModel` with a custom API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self { model_id, api_key, base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Points the model at a different endpoint (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds the wire request for a `ModelRequest`.
    fn build_request(request: &ModelRequest) -> Result<GeminiRequest, ModelError> {
        let mut parts = vec![GeminiPart::Text { text: request.prompt.clone() }];

        for attachment in &request.attachments {
            let encoded_size = calculate_base64_size(attachment.data.len());
            if encoded_size > MAX_INLINE_SIZE {
                return Err(ModelError::Rejected {
                    reason: format!(
                        "attachment of type {} is {} bytes encoded, limit is {}",
                        attachment.mime_type, encoded_size, MAX_INLINE_SIZE
                    ),
                });
            }
            parts.push(GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.to_base64(),
                },
            });
        }

        let tools = if request.uses_web_search() {
            Some(vec![GeminiTool { google_search: serde_json::json!({}) }])
        } else {
            None
        };

        // The API refuses a JSON mime type together with the search tool, so a
        // grounded request always comes back as free text.
        let generation_config = match request.response_format {
            ResponseFormat::Json if request.uses_web_search() => {
                debug!("Dropping JSON response mime type for grounded request");
                None
            }
            ResponseFormat::Json => Some(GeminiGenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
            ResponseFormat::FreeText => None,
        };

        Ok(GeminiRequest {
            contents: vec![GeminiContent { role: Some("user".to_string()), parts }],
            tools,
            generation_config,
        })
    }

    /// Maps a non-success HTTP status to a `ModelError`.
    fn map_http_error(status: StatusCode, error_text: String) -> ModelError {
        if status == StatusCode::TOO_MANY_REQUESTS
            || error_text.to_uppercase().contains("RESOURCE_EXHAUSTED")
        {
            return ModelError::RateLimited {
                provider: "gemini".to_string(),
                message: Some(error_text),
            };
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return ModelError::Transport(format!(
                "Authentication failed ({}): {}",
                status, error_text
            ));
        }

        ModelError::Transport(format!("API error ({}): {}", status, error_text))
    }

    /// Turns a decoded API response into a `ModelResponse`.
    fn into_model_response(
        &self,
        response: GeminiResponse,
    ) -> Result<ModelResponse, ModelError> {
        if let Some(reason) = response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            warn!(provider = "gemini", reason = %reason, "Prompt was blocked");
            return Err(ModelError::Rejected { reason: format!("prompt blocked: {}", reason) });
        }

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            error!("No candidates in Gemini API response");
            ModelError::Transport("No content in API response".to_string())
        })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        GeminiPart::Text { text } => Some(text),
                        GeminiPart::InlineData { .. } | GeminiPart::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = candidate
                .finish_reason
                .as_deref()
                .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
            {
                warn!(provider = "gemini", reason = %reason, "Candidate withheld by safety filters");
                return Err(ModelError::Rejected {
                    reason: format!("response withheld: {}", reason),
                });
            }
            error!("No text content in Gemini API response");
            return Err(ModelError::Transport("No text content in API response".to_string()));
        }

        let grounding_sources = candidate
            .grounding_metadata
            .map(|metadata| collect_sources(metadata.grounding_chunks))
            .unwrap_or_default();

        let usage = response.usage_metadata.map(|meta| ModelUsage {
            prompt_tokens: meta.prompt_token_count.unwrap_or(0),
            completion_tokens: meta.candidates_token_count.unwrap_or(0),
            total_tokens: meta.total_token_count.unwrap_or(0),
        });

        Ok(ModelResponse {
            raw_text: text,
            grounding_sources,
            model_id: Some(self.model_id.clone()),
            usage,
        })
    }
}

/// Keeps web chunks with a URI, dropping repeats of the same URL.
fn collect_sources(chunks: Vec<GeminiGroundingChunk>) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| {
            let url = web.uri?;
            if !seen.insert(url.clone()) {
                return None;
            }
            let title = web.title.unwrap_or_else(|| url.clone());
            Some(GroundingSource { url, title })
        })
        .collect()
}

/// Size of data after base64 encoding, padding included.
fn calculate_base64_size(data_size: usize) -> usize {
    data_size.div_ceil(3) * 4
}

#[async_trait]
impl Model for GeminiModel {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = request.prompt.len(),
            attachments = request.attachments.len(),
            web_search = request.uses_web_search(),
            format = ?request.response_format,
            "GeminiModel invoking"
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_id, self.api_key
        );
        let body = Self::build_request(request)?;

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            error!(error = %e, "Failed to send request to Gemini API");
            ModelError::Transport(format!("Network error: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Gemini API returned error status");
            return Err(Self::map_http_error(status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini API response");
            ModelError::Serialization(format!("Failed to parse response: {}", e))
        })?;

        self.into_model_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inline_data", alias = "inlineData")]
        inline_data: GeminiInlineData,
    },
    // Function calls, thoughts and other parts we never read back
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mime_type", alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    web: Option<GeminiWebChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_abstraction::Attachment;

    fn model() -> GeminiModel {
        GeminiModel::with_api_key("gemini-2.5-flash".to_string(), "test-key".to_string())
    }

    #[test]
    fn test_gemini_model_creation_with_api_key() {
        let model = model().with_base_url("http://localhost:1234/");
        assert_eq!(model.model_id(), "gemini-2.5-flash");
        assert_eq!(model.base_url, "http://localhost:1234");
    }

    #[test]
    fn test_plain_request_serialization() {
        let body = GeminiModel::build_request(&ModelRequest::text("Hello")).unwrap();
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert!(json.get("tools").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_attachment_and_json_request_serialization() {
        let request = ModelRequest::text("Rate this ad")
            .with_attachment(Attachment::new("image/png", b"png".to_vec()))
            .json();
        let json = serde_json::to_value(GeminiModel::build_request(&request).unwrap()).unwrap();

        let inline = &json["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(inline["mime_type"], "image/png");
        assert_eq!(inline["data"], "cG5n");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_grounded_request_drops_json_mime_type() {
        let request = ModelRequest::text("Who ranks for running shoes?").with_web_search().json();
        let json = serde_json::to_value(GeminiModel::build_request(&request).unwrap()).unwrap();

        assert!(json["tools"][0].get("google_search").is_some());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_oversized_attachment_is_rejected() {
        let request = ModelRequest::text("big")
            .with_attachment(Attachment::new("image/png", vec![0; MAX_INLINE_SIZE]));
        assert!(matches!(
            GeminiModel::build_request(&request),
            Err(ModelError::Rejected { .. })
        ));
    }

    #[test]
    fn test_base64_size_calculation() {
        assert_eq!(calculate_base64_size(0), 0);
        assert_eq!(calculate_base64_size(1), 4);
        assert_eq!(calculate_base64_size(3), 4);
        assert_eq!(calculate_base64_size(4), 8);
    }

    #[test]
    fn test_http_error_mapping() {
        let err = GeminiModel::map_http_error(StatusCode::TOO_MANY_REQUESTS, "slow".to_string());
        assert!(matches!(err, ModelError::RateLimited { .. }));

        let err = GeminiModel::map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        );
        assert!(err.is_rate_limited());

        let err = GeminiModel::map_http_error(StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert!(matches!(err, ModelError::Transport(ref m) if m.contains("Authentication failed")));
        assert!(!err.is_rate_limited());

        let err = GeminiModel::map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
        assert!(matches!(err, ModelError::Transport(_)));
    }

    #[test]
    fn test_response_with_grounding_is_deduplicated() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Part one. "}, {"text": "Part two."}]},
                "finishReason": "STOP",
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"uri": "https://b.example"}},
                    {"web": {"uri": "https://a.example", "title": "A again"}},
                    {"retrievedContext": {}}
                ]}
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;
        let decoded: GeminiResponse = serde_json::from_str(raw).unwrap();
        let response = model().into_model_response(decoded).unwrap();

        assert_eq!(response.raw_text, "Part one. Part two.");
        assert_eq!(response.grounding_sources.len(), 2);
        assert_eq!(response.grounding_sources[0].title, "A");
        assert_eq!(response.grounding_sources[1].title, "https://b.example");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.model_id.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_blocked_prompt_is_rejected() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let decoded: GeminiResponse = serde_json::from_str(raw).unwrap();
        let err = model().into_model_response(decoded).unwrap_err();
        assert!(matches!(err, ModelError::Rejected { ref reason } if reason.contains("SAFETY")));
    }

    #[test]
    fn test_withheld_candidate_is_rejected() {
        let raw = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let decoded: GeminiResponse = serde_json::from_str(raw).unwrap();
        let err = model().into_model_response(decoded).unwrap_err();
        assert!(matches!(err, ModelError::Rejected { .. }));
    }

    #[test]
    fn test_empty_candidates_is_transport_error() {
        let decoded: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        let err = model().into_model_response(decoded).unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)));
    }

    #[tokio::test]
    #[ignore = "Requires GEMINI_API_KEY and network access"]
    async fn test_gemini_invoke_live() {
        let model = GeminiModel::new("gemini-2.5-flash".to_string()).unwrap();
        let response = model.invoke(&ModelRequest::text("Say hello")).await.unwrap();
        assert!(!response.raw_text.is_empty());
    }
}

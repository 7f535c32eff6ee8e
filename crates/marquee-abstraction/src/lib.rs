//! Model abstraction layer for Marquee.
//!
//! This module defines the calling contract between the orchestration layer and a
//! hosted generative model: the request shape, the response shape, the error
//! taxonomy an adapter may surface, and the `Model` trait itself.
//!
//! Adapters never retry on their own. Resilience is layered on top by the
//! orchestrator's retry policy.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Represents an error that can occur when invoking a generative model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// Network, authentication, or protocol failure talking to the provider.
    #[error("Transport Error: {0}")]
    Transport(String),

    /// The provider declined the request (e.g., a content-safety block).
    #[error("Request rejected by model: {reason}")]
    Rejected {
        /// Reason reported by the provider.
        reason: String,
    },

    /// The provider signalled rate limiting or resource exhaustion.
    #[error("Provider '{provider}' rate limited the request{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    RateLimited {
        /// The provider name (e.g., "gemini").
        provider: String,
        /// Optional error body from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The provider answered with a payload we could not decode.
    #[error("Serialization Error: {0}")]
    Serialization(String),

    /// The model provider is not supported or configured.
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

/// Substrings that mark an error message as a rate-limit signal.
///
/// Matching is case-insensitive. `"429"` and `"RESOURCE_EXHAUSTED"` come from the
/// HTTP status and the Google RPC status respectively.
pub const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "resource_exhausted", "rate limit"];

impl ModelError {
    /// Returns `true` when this error means "slow down and try again".
    ///
    /// The structured `RateLimited` variant is authoritative. Other variants fall
    /// back to sniffing the message for the known markers, for adapters that only
    /// surface a status string.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Rejected { .. } | Self::UnsupportedModelProvider(_) => false,
            Self::Transport(message) | Self::Serialization(message) | Self::Other(message) => {
                message_signals_rate_limit(message)
            }
        }
    }
}

/// Checks a raw error message for any of the [`RATE_LIMIT_MARKERS`].
pub fn message_signals_rate_limit(message: &str) -> bool {
    let lowered = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// A binary payload sent alongside the prompt (e.g., an image to analyse).
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// MIME type of the payload, e.g. `image/png`.
    pub mime_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates a new attachment.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { mime_type: mime_type.into(), data }
    }

    /// Returns the payload encoded as standard Base64, as the wire format expects.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Optional capabilities the model may use while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTool {
    /// Live web search; the response carries grounding sources.
    WebSearch,
}

/// The shape the caller expects the answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Unconstrained text.
    #[default]
    FreeText,
    /// Ask the provider to emit JSON.
    Json,
}

/// A single request to a generative model. Built once per call and never mutated
/// after being handed to an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelRequest {
    /// The natural-language prompt.
    pub prompt: String,
    /// Ordered binary attachments (possibly empty).
    pub attachments: Vec<Attachment>,
    /// Enabled capabilities.
    pub tools: BTreeSet<ModelTool>,
    /// Desired response format.
    pub response_format: ResponseFormat,
}

impl ModelRequest {
    /// A plain text request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Self::default() }
    }

    /// Appends an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Enables live web search grounding.
    #[must_use]
    pub fn with_web_search(mut self) -> Self {
        self.tools.insert(ModelTool::WebSearch);
        self
    }

    /// Requests a JSON response.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    /// Whether web search grounding is enabled.
    pub fn uses_web_search(&self) -> bool {
        self.tools.contains(&ModelTool::WebSearch)
    }
}

/// A web citation backing a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    /// Source URL.
    pub url: String,
    /// Page title as reported by the provider.
    pub title: String,
}

/// Usage statistics for a model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,
    /// Number of tokens in the completion.
    pub completion_tokens: u32,
    /// Total number of tokens used.
    pub total_tokens: u32,
}

/// The answer to one [`ModelRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The raw generated text, exactly as the provider returned it.
    pub raw_text: String,
    /// Grounding citations, in provider order (possibly empty).
    #[serde(default)]
    pub grounding_sources: Vec<GroundingSource>,
    /// Optional: The ID of the model that produced the response.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Optional: Usage statistics.
    #[serde(default)]
    pub usage: Option<ModelUsage>,
}

impl ModelResponse {
    /// A response carrying only text.
    pub fn text(raw_text: impl Into<String>) -> Self {
        Self { raw_text: raw_text.into(), ..Self::default() }
    }

    /// Attaches grounding sources.
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<GroundingSource>) -> Self {
        self.grounding_sources = sources;
        self
    }
}

/// A trait for invoking hosted generative models.
///
/// All models must be `Send + Sync` so one instance can be shared by every
/// workflow in the process.
#[async_trait]
pub trait Model: Send + Sync {
    /// Issues a single request to the model.
    ///
    /// # Errors
    /// Returns `ModelError::Transport` on network/auth failures,
    /// `ModelError::Rejected` when the provider declines the request and
    /// `ModelError::RateLimited` when the provider asks the caller to slow down.
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_rate_limit_is_retryable() {
        let err = ModelError::RateLimited { provider: "gemini".to_string(), message: None };
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "Provider 'gemini' rate limited the request");
    }

    #[test]
    fn test_rate_limit_sniffing() {
        assert!(ModelError::Transport("HTTP 429 Too Many Requests".to_string()).is_rate_limited());
        assert!(ModelError::Other("status: RESOURCE_EXHAUSTED".to_string()).is_rate_limited());
        assert!(ModelError::Transport("Rate Limit reached".to_string()).is_rate_limited());
        assert!(!ModelError::Transport("HTTP 400 bad request".to_string()).is_rate_limited());
        // Rejections never retry, whatever the message says.
        assert!(!ModelError::Rejected { reason: "429".to_string() }.is_rate_limited());
    }

    #[test]
    fn test_request_builder() {
        let request = ModelRequest::text("Describe this")
            .with_attachment(Attachment::new("image/png", vec![1, 2, 3]))
            .with_web_search()
            .json();

        assert_eq!(request.prompt, "Describe this");
        assert_eq!(request.attachments.len(), 1);
        assert!(request.uses_web_search());
        assert_eq!(request.response_format, ResponseFormat::Json);
        assert!(!ModelRequest::text("plain").uses_web_search());
    }

    #[test]
    fn test_attachment_base64_and_debug() {
        let attachment = Attachment::new("image/png", b"hello".to_vec());
        assert_eq!(attachment.to_base64(), "aGVsbG8=");
        let debug = format!("{attachment:?}");
        assert!(debug.contains("bytes: 5"));
        assert!(!debug.contains("104"));
    }

    #[test]
    fn test_response_deserializes_with_defaults() {
        let response: ModelResponse = serde_json::from_str(r#"{"raw_text": "hi"}"#).unwrap();
        assert_eq!(response.raw_text, "hi");
        assert!(response.grounding_sources.is_empty());
        assert!(response.usage.is_none());
    }
}

//! Model factory for creating model instances from configuration.
//!
//! This module is what the application's composition root calls to obtain the
//! single process-wide model adapter, handling API key loading from the
//! environment.

use crate::{GeminiModel, MockModel};
use marquee_abstraction::{Model, ModelError};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Default Gemini model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Model type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Mock model for testing and offline runs.
    Mock,
    /// Google Gemini model.
    Gemini,
}

impl FromStr for ModelType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(()),
        }
    }
}

/// Model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The type of model to create.
    pub model_type: ModelType,
    /// The model ID (e.g., "gemini-2.5-flash").
    pub model_id: String,
    /// Optional API key (if not provided, will be loaded from environment).
    pub api_key: Option<String>,
    /// Optional endpoint override.
    pub base_url: Option<String>,
    /// Reply the mock engine gives to every call.
    pub mock_reply: Option<String>,
}

impl ModelConfig {
    /// Creates a new `ModelConfig` with the given type and model ID.
    #[must_use]
    pub fn new(model_type: ModelType, model_id: String) -> Self {
        Self { model_type, model_id, api_key: None, base_url: None, mock_reply: None }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the endpoint for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Sets the reply the mock engine gives to every call.
    #[must_use]
    pub fn with_mock_reply(mut self, reply: String) -> Self {
        self.mock_reply = Some(reply);
        self
    }
}

/// Factory for creating model instances.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model instance from the given configuration.
    ///
    /// # Errors
    /// Returns a `ModelError` if model creation fails (e.g., missing API key).
    pub fn create(config: ModelConfig) -> Result<Arc<dyn Model>, ModelError> {
        debug!(
            model_type = ?config.model_type,
            model_id = %config.model_id,
            "Creating model instance"
        );

        match config.model_type {
            ModelType::Mock => {
                let model = MockModel::new(config.model_id);
                Ok(Arc::new(match config.mock_reply {
                    Some(reply) => model.with_fallback(reply),
                    None => model,
                }))
            }
            ModelType::Gemini => {
                let mut model = if let Some(api_key) = config.api_key {
                    GeminiModel::with_api_key(config.model_id, api_key)
                } else {
                    GeminiModel::new(config.model_id)?
                };
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Ok(Arc::new(model))
            }
        }
    }

    /// Creates a model instance from a model type string and model ID.
    ///
    /// # Errors
    /// Returns a `ModelError` if the model type is unrecognized or creation fails.
    pub fn create_from_str(
        model_type_str: &str,
        model_id: String,
    ) -> Result<Arc<dyn Model>, ModelError> {
        let model_type = ModelType::from_str(model_type_str).map_err(|()| {
            error!(model_type = %model_type_str, "Unrecognized model type");
            ModelError::UnsupportedModelProvider(format!(
                "Unrecognized model type: {}",
                model_type_str
            ))
        })?;

        Self::create(ModelConfig::new(model_type, model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_from_str() {
        assert_eq!(ModelType::from_str("mock"), Ok(ModelType::Mock));
        assert_eq!(ModelType::from_str("MOCK"), Ok(ModelType::Mock));
        assert_eq!(ModelType::from_str("gemini"), Ok(ModelType::Gemini));
        assert_eq!(ModelType::from_str("Google"), Ok(ModelType::Gemini));
        assert_eq!(ModelType::from_str("openai"), Err(()));
    }

    #[test]
    fn test_model_config() {
        let config = ModelConfig::new(ModelType::Gemini, "gemini-2.5-pro".to_string())
            .with_api_key("test-key".to_string())
            .with_base_url("http://localhost:9999".to_string());
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:9999"));
    }

    #[test]
    fn test_factory_create_mock() {
        let model = ModelFactory::create_from_str("mock", "test-mock".to_string()).unwrap();
        assert_eq!(model.model_id(), "test-mock");
    }

    #[tokio::test]
    async fn test_factory_mock_uses_canned_reply() {
        let config = ModelConfig::new(ModelType::Mock, "mock".to_string())
            .with_mock_reply(r#"{"personas": []}"#.to_string());
        let model = ModelFactory::create(config).unwrap();
        let response = model.invoke(&marquee_abstraction::ModelRequest::text("hi")).await.unwrap();
        assert_eq!(response.raw_text, r#"{"personas": []}"#);
    }

    #[test]
    fn test_factory_create_gemini_with_api_key() {
        let config = ModelConfig::new(ModelType::Gemini, DEFAULT_GEMINI_MODEL.to_string())
            .with_api_key("test-api-key".to_string());
        let model = ModelFactory::create(config).unwrap();
        assert_eq!(model.model_id(), DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_factory_create_invalid_type() {
        let result = ModelFactory::create_from_str("invalid", "test".to_string());
        assert!(matches!(result, Err(ModelError::UnsupportedModelProvider(_))));
    }
}

//! Scripted model for tests and offline runs.

use async_trait::async_trait;
use marquee_abstraction::{Model, ModelError, ModelRequest, ModelResponse, ModelUsage};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// A mock implementation of the `Model` trait.
///
/// Scripted outcomes are returned in order, one per `invoke`. Once the script runs
/// dry the model answers with its fallback reply, or echoes the prompt back when
/// none is set. Every request is recorded so tests can assert on what was sent.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID and an empty script.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// Queues a text response.
    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(ModelResponse::text(text)));
        self
    }

    /// Queues a full response (e.g., one carrying grounding sources).
    #[must_use]
    pub fn with_model_response(self, response: ModelResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queues an error.
    #[must_use]
    pub fn with_error(self, error: ModelError) -> Self {
        self.push(Err(error));
        self
    }

    /// Sets the reply returned for every call once the script is empty.
    #[must_use]
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Queues an outcome on an already shared model.
    pub fn push(&self, outcome: Result<ModelResponse, ModelError>) {
        lock(&self.script).push_back(outcome);
    }

    /// Number of times `invoke` was called.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Copies of every request received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.requests).clone()
    }
}

// A poisoned lock only means a test thread panicked mid-push; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl Model for MockModel {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            prompt_len = request.prompt.len(),
            "MockModel invoking"
        );

        lock(&self.requests).push(request.clone());

        let scripted = lock(&self.script).pop_front();
        match scripted {
            Some(outcome) => outcome.map(|mut response| {
                response.model_id.get_or_insert_with(|| self.id.clone());
                response
            }),
            None => {
                let raw_text = self
                    .fallback
                    .clone()
                    .unwrap_or_else(|| format!("Mock response for: {}", request.prompt));
                let prompt_tokens = count_tokens(&request.prompt);
                let completion_tokens = count_tokens(&raw_text);
                Ok(ModelResponse {
                    raw_text,
                    grounding_sources: Vec::new(),
                    model_id: Some(self.id.clone()),
                    usage: Some(ModelUsage {
                        prompt_tokens,
                        completion_tokens,
                        total_tokens: prompt_tokens + completion_tokens,
                    }),
                })
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_is_consumed_in_order() {
        let model = MockModel::new("mock")
            .with_response("first")
            .with_error(ModelError::Transport("down".to_string()))
            .with_response("third");

        let first = model.invoke(&ModelRequest::text("a")).await.unwrap();
        assert_eq!(first.raw_text, "first");
        assert_eq!(first.model_id.as_deref(), Some("mock"));

        let second = model.invoke(&ModelRequest::text("b")).await;
        assert!(matches!(second, Err(ModelError::Transport(_))));

        let third = model.invoke(&ModelRequest::text("c")).await.unwrap();
        assert_eq!(third.raw_text, "third");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_echo_fallback_records_requests() {
        let model = MockModel::new("mock");
        let response = model.invoke(&ModelRequest::text("hello there").with_web_search()).await.unwrap();

        assert_eq!(response.raw_text, "Mock response for: hello there");
        assert_eq!(response.usage.unwrap().prompt_tokens, 2);
        assert!(model.requests()[0].uses_web_search());
    }

    #[tokio::test]
    async fn test_fallback_follows_script() {
        let model = MockModel::new("mock").with_response("scripted").with_fallback(r#"{"ok": true}"#);

        assert_eq!(model.invoke(&ModelRequest::text("a")).await.unwrap().raw_text, "scripted");
        for prompt in ["b", "c"] {
            let response = model.invoke(&ModelRequest::text(prompt)).await.unwrap();
            assert_eq!(response.raw_text, r#"{"ok": true}"#);
        }
        assert_eq!(model.call_count(), 3);
    }
}

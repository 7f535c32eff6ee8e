//! The single entry point strategy functions and workflows call the model through.

use crate::domain::Grounded;
use crate::error::Result;
use crate::normalize;
use crate::pacing::{NoPacing, Pacing};
use crate::retry::RetryPolicy;
use marquee_abstraction::{Model, ModelRequest, ModelResponse};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Model adapter plus the policies every call goes through.
///
/// Cheap to clone; workflows hold their own copy for the lifetime of the stream.
#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn Model>,
    retry: RetryPolicy,
    pacing: Arc<dyn Pacing>,
}

impl Orchestrator {
    /// Wraps a model with the default retry policy and no pacing.
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model, retry: RetryPolicy::default(), pacing: Arc::new(NoPacing) }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Arc<dyn Pacing>) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Pacing policy for the stages of the workflows this orchestrator runs.
    pub fn pacing(&self) -> Arc<dyn Pacing> {
        Arc::clone(&self.pacing)
    }

    /// One model call under the retry policy.
    ///
    /// # Errors
    /// `ServiceBusy` after persistent rate limiting, otherwise the adapter error.
    pub async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        debug!(
            model_id = %self.model.model_id(),
            prompt_len = request.prompt.len(),
            attachments = request.attachments.len(),
            web_search = request.uses_web_search(),
            "Invoking model"
        );
        self.retry.run(|| self.model.invoke(request)).await
    }

    /// Invokes the model and maps the normalized reply onto `T`.
    ///
    /// # Errors
    /// Any invocation error, `MalformedResponse`, or `SchemaMismatch`.
    pub async fn extract<T: DeserializeOwned>(&self, request: &ModelRequest) -> Result<T> {
        let response = self.invoke(request).await?;
        normalize::extract(&response.raw_text)
    }

    /// Like [`Self::extract`], keeping the grounding sources of the reply.
    ///
    /// # Errors
    /// Same as [`Self::extract`].
    pub async fn extract_grounded<T: DeserializeOwned>(
        &self,
        request: &ModelRequest,
    ) -> Result<Grounded<T>> {
        let response = self.invoke(request).await?;
        let value = normalize::extract(&response.raw_text)?;
        Ok(Grounded { value, sources: response.grounding_sources })
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model_id", &self.model.model_id())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

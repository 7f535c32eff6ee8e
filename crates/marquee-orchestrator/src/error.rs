// Error types for orchestration

use marquee_abstraction::ModelError;
use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The normalizer was handed a payload that is not text.
    #[error("Invalid payload type: {0}")]
    InvalidType(String),

    /// Text was extracted but holds no valid structured data.
    #[error("Malformed model response: {reason}")]
    MalformedResponse {
        /// Parser diagnostic.
        reason: String,
        /// The text that failed to parse, after cleanup.
        cleaned: String,
    },

    /// Rate-limit retries were exhausted.
    #[error("Service busy after {attempts} attempts: {message}")]
    ServiceBusy {
        /// How many times the call was made.
        attempts: u32,
        /// User-facing message.
        message: String,
    },

    /// Error from the model adapter (transport, rejection, ...).
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The parsed value lacks fields the caller requires.
    #[error("Response for {target} does not match the expected shape: {reason}")]
    SchemaMismatch {
        /// Name of the result type being built.
        target: &'static str,
        /// Which field or type check failed.
        reason: String,
    },

    /// The retry loop ended without a result or an error.
    #[error("Retry loop exhausted without a result")]
    RetryExhausted,

    /// A progress event tried to move a stage backwards.
    #[error("Stage '{stage}' cannot move from {from} to {to}")]
    StageRegression {
        stage: String,
        from: crate::pipeline::StageStatus,
        to: crate::pipeline::StageStatus,
    },

    /// The progress stream ended before its final stage delivered a result.
    #[error("Workflow ended without a result")]
    Incomplete,

    /// A workflow was given inputs it cannot run with.
    #[error("Invalid workflow input: {0}")]
    InvalidInput(String),
}

/// Message shown when the provider keeps rate limiting us.
pub const SERVICE_BUSY_MESSAGE: &str =
    "The AI service is busy right now. Please wait a minute and try again.";

impl OrchestrationError {
    /// A single human-readable line suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidType(_) => {
                "Internal error: the assistant's reply could not be read as text.".to_string()
            }
            Self::MalformedResponse { .. } | Self::SchemaMismatch { .. } => {
                "The assistant returned an unreadable response. Please try again.".to_string()
            }
            Self::ServiceBusy { message, .. } => message.clone(),
            Self::Model(ModelError::Rejected { reason }) => {
                format!("The request was declined by the AI service ({reason}).")
            }
            Self::Model(ModelError::UnsupportedModelProvider(detail)) => {
                format!("The AI service is not configured: {detail}")
            }
            Self::Model(err) => format!("Could not reach the AI service: {err}"),
            Self::RetryExhausted | Self::Incomplete | Self::StageRegression { .. } => {
                "The request could not be completed. Please try again.".to_string()
            }
            Self::InvalidInput(detail) => detail.clone(),
        }
    }

    /// Whether this is the distinct "system is busy" condition.
    pub fn is_service_busy(&self) -> bool {
        matches!(self, Self::ServiceBusy { .. })
    }
}

//! Response normalization.
//!
//! Models wrap JSON in prose, in markdown fences, or both, and occasionally leak
//! control bytes. `normalize` coerces such text into a parsed value with an ordered
//! chain of cheap fixes: strip control characters, unwrap the first fenced block,
//! then slice to the outermost bracket span, and finally parse.

use crate::error::{OrchestrationError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Parses a raw byte payload, rejecting anything that is not UTF-8 text.
pub fn normalize_bytes(raw: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        OrchestrationError::InvalidType(format!("payload is not UTF-8 text: {}", e))
    })?;
    normalize(text)
}

/// Extracts the JSON value embedded in model output.
///
/// # Errors
/// Returns `OrchestrationError::MalformedResponse` carrying the cleaned text when
/// nothing parseable remains after cleanup.
pub fn normalize(raw: &str) -> Result<Value> {
    let cleaned = clean(raw);

    serde_json::from_str(&cleaned).map_err(|e| {
        warn!(error = %e, len = cleaned.len(), "Model response is not valid JSON");
        OrchestrationError::MalformedResponse { reason: e.to_string(), cleaned }
    })
}

/// Normalizes and then maps the value onto `T`.
///
/// Serde's own checks are the schema: a missing required field or a mistyped
/// value becomes `SchemaMismatch`.
pub fn extract<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = normalize(raw)?;
    shape(value)
}

/// Maps an already parsed value onto `T`.
pub fn shape<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| OrchestrationError::SchemaMismatch {
        target: std::any::type_name::<T>(),
        reason: e.to_string(),
    })
}

/// Runs every cleanup step and returns the text that will be parsed.
pub fn clean(raw: &str) -> String {
    let stripped = strip_control_chars(raw);
    let unfenced = unwrap_fence(stripped.trim());
    let sliced = slice_outermost(unfenced);
    debug!(
        raw_len = raw.len(),
        cleaned_len = sliced.len(),
        "Normalized model response"
    );
    sliced.to_string()
}

/// Drops control characters other than tab, newline and carriage return.
fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r')).collect()
}

/// Returns the trimmed body of the first complete fenced block, if any.
fn unwrap_fence(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text;
    };
    let mut body = &text[open + FENCE.len()..];
    if body.get(..JSON_TAG.len()).is_some_and(|tag| tag.eq_ignore_ascii_case(JSON_TAG)) {
        body = &body[JSON_TAG.len()..];
    }
    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => text,
    }
}

/// Slices to the span between the first opening bracket and the last matching closer.
fn slice_outermost(text: &str) -> &str {
    if text.starts_with(['{', '[']) {
        return text;
    }
    let Some(open) = text.find(['{', '[']) else {
        return text;
    };
    let closer = if text[open..].starts_with('{') { '}' } else { ']' };
    match text.rfind(closer) {
        Some(close) if close > open => &text[open..=close],
        _ => text,
    }
}

//! Normalization collaborators
//!
//! A `Normalizer` turns one raw record into a JSON object shaped like a
//! normalized record. It is treated as a fallible black box: the harvest core
//! merges its output with the record's identity and falls back to a
//! placeholder record whenever it fails.

mod chat;
mod prompt;

pub use chat::ChatCompletionNormalizer;
pub use prompt::{build_prompt, build_sections, strip_code_fence, SYSTEM_PROMPT};

use crate::model::RawRecord;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors reported by a normalizer
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Normalizer timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Normalizer API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Normalizer network error: {0}")]
    Network(String),

    #[error("Malformed normalizer output: {0}")]
    Malformed(String),

    #[error("Missing normalizer credentials: environment variable {0} is not set")]
    MissingCredentials(String),
}

/// Result type for normalization
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Maps a raw record to structured JSON
#[async_trait]
pub trait Normalizer: Send + Sync {
    /// Returns the structured form of `record`
    ///
    /// Implementations must return syntactically valid JSON or fail; partial
    /// output is never returned.
    async fn normalize(&self, record: &RawRecord) -> NormalizeResult<Value>;
}

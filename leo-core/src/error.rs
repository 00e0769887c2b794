use std::{error::Error as StdError, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeoError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Max retries ({max}) exceeded")]
    MaxRetriesExceeded { max: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

impl From<EmbeddingError> for LeoError {
    fn from(err: EmbeddingError) -> Self {
        LeoError::Custom(err.to_string())
    }
}

impl From<StoreError> for LeoError {
    fn from(err: StoreError) -> Self {
        LeoError::Custom(err.to_string())
    }
}

/// Failures while turning text into vectors.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding response was unusable: {0}")]
    InvalidResponse(String),
    #[error("embedding provider error: {0}")]
    Provider(String),
    #[error("embedding request failed: {0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("invalid document id: {0}")]
    InvalidId(String),
    #[error("Store error: {0}")]
    Internal(#[source] Box<dyn StdError + Send + Sync>),
}

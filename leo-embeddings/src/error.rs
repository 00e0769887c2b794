use leo_core::EmbeddingError;
use thiserror::Error;

/// Failures specific to the OpenAI embeddings endpoint.
#[derive(Debug, Error)]
pub enum EmbeddingProviderError {
    #[error("openai embeddings request failed: {0}")]
    Request(String),
    #[error("{0}")]
    InvalidResponse(String),
    #[error("expected {expected}-dimensional embeddings, got {got}")]
    Dimension { expected: usize, got: usize },
    #[error("expected {expected} embeddings, got {got}")]
    Count { expected: usize, got: usize },
}

impl From<EmbeddingProviderError> for EmbeddingError {
    fn from(err: EmbeddingProviderError) -> Self {
        match err {
            EmbeddingProviderError::Request(message) => EmbeddingError::Provider(message),
            EmbeddingProviderError::InvalidResponse(message) => EmbeddingError::InvalidResponse(message),
            other => EmbeddingError::InvalidResponse(other.to_string()),
        }
    }
}

use leo_core::{LeoError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PineconeStoreError {
    #[error("pinecone is misconfigured: {0}")]
    Config(String),
    #[error("could not reach pinecone: {0}")]
    Transport(String),
    #[error("pinecone returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        namespace: Option<String>,
    },
    #[error("unexpected pinecone response: {0}")]
    Malformed(String),
    #[error("match has no '{text_key}' text in its metadata")]
    MissingTextKey { text_key: String },
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("embedder returned {embeddings} vectors for {docs} documents")]
    BatchMismatch { docs: usize, embeddings: usize },
}

impl PineconeStoreError {
    /// The control plane answers 409 `ALREADY_EXISTS` when the index is there already.
    pub fn is_already_exists(&self) -> bool {
        let PineconeStoreError::Api {
            status: 409,
            code,
            message,
            ..
        } = self
        else {
            return false;
        };
        code.as_deref() == Some("ALREADY_EXISTS") || message.contains("ALREADY_EXISTS")
    }

    /// Worth retrying: pinecone was unreachable or answered 429 or 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            PineconeStoreError::Transport(_) => true,
            PineconeStoreError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<PineconeStoreError> for LeoError {
    fn from(err: PineconeStoreError) -> Self {
        LeoError::Custom(err.to_string())
    }
}

impl From<PineconeStoreError> for StoreError {
    fn from(err: PineconeStoreError) -> Self {
        match err {
            PineconeStoreError::DimensionMismatch { expected, got } => {
                StoreError::DimensionMismatch { expected, got }
            }
            other => StoreError::Internal(Box::new(other)),
        }
    }
}
